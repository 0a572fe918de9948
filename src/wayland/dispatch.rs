// Compositor event handlers
//
// All of these run on the dispatch thread during a dispatch call.
// Input events are handed straight to the input router.
//
// Austin Shafer - 2020
use crate::input::InputRouter;
use utils::log;

use wayland_client::protocol::{
    wl_compositor::WlCompositor,
    wl_keyboard::{self, WlKeyboard},
    wl_pointer::{self, WlPointer},
    wl_region::WlRegion,
    wl_registry::{self, WlRegistry},
    wl_seat::{self, WlSeat},
    wl_shm::WlShm,
    wl_surface::WlSurface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols::wp::pointer_constraints::zv1::client::{
    zwp_confined_pointer_v1::ZwpConfinedPointerV1, zwp_locked_pointer_v1::ZwpLockedPointerV1,
    zwp_pointer_constraints_v1::ZwpPointerConstraintsV1,
};
use wayland_protocols::wp::relative_pointer::zv1::client::{
    zwp_relative_pointer_manager_v1::ZwpRelativePointerManagerV1,
    zwp_relative_pointer_v1::{self, ZwpRelativePointerV1},
};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::XdgToplevel,
    xdg_wm_base::{self, XdgWmBase},
};

/// The compositor globals and input objects we hold
pub struct WaylandState {
    pub ws_router: InputRouter,
    pub ws_compositor: Option<WlCompositor>,
    pub ws_wm_base: Option<XdgWmBase>,
    pub ws_seat: Option<WlSeat>,
    pub ws_shm: Option<WlShm>,
    pub ws_constraints: Option<ZwpPointerConstraintsV1>,
    pub ws_relative_manager: Option<ZwpRelativePointerManagerV1>,
    pub ws_pointer: Option<WlPointer>,
    pub ws_keyboard: Option<WlKeyboard>,
    /// The presentation surface has been configured by the compositor
    pub ws_configured: bool,
}

impl WaylandState {
    pub fn new(router: InputRouter) -> Self {
        Self {
            ws_router: router,
            ws_compositor: None,
            ws_wm_base: None,
            ws_seat: None,
            ws_shm: None,
            ws_constraints: None,
            ws_relative_manager: None,
            ws_pointer: None,
            ws_keyboard: None,
            ws_configured: false,
        }
    }
}

impl Dispatch<WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            match interface.as_str() {
                "wl_compositor" => {
                    state.ws_compositor = Some(registry.bind(name, version.min(4), qh, ()))
                }
                "xdg_wm_base" => state.ws_wm_base = Some(registry.bind(name, version.min(2), qh, ())),
                "wl_seat" => state.ws_seat = Some(registry.bind(name, version.min(5), qh, ())),
                "wl_shm" => state.ws_shm = Some(registry.bind(name, 1, qh, ())),
                "zwp_pointer_constraints_v1" => {
                    state.ws_constraints = Some(registry.bind(name, 1, qh, ()))
                }
                "zwp_relative_pointer_manager_v1" => {
                    state.ws_relative_manager = Some(registry.bind(name, 1, qh, ()))
                }
                _ => {}
            }
        }
    }
}

/// Pointers and keyboards from seats older than v3 have no
/// destructor and are simply dropped
fn can_release(version: u32) -> bool {
    version >= wl_pointer::REQ_RELEASE_SINCE
}

impl Dispatch<WlSeat, ()> for WaylandState {
    fn event(
        state: &mut Self,
        seat: &WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let caps = match event {
            wl_seat::Event::Capabilities {
                capabilities: WEnum::Value(caps),
            } => caps,
            _ => return,
        };

        let has_pointer = caps.contains(wl_seat::Capability::Pointer);
        match (has_pointer, state.ws_pointer.take()) {
            (true, None) => {
                state.ws_pointer = Some(seat.get_pointer(qh, ()));
                state.ws_router.bind_pointer();
            }
            (false, Some(pointer)) => {
                log::debug!("Seat lost its pointer");
                if can_release(pointer.version()) {
                    pointer.release();
                }
                state.ws_router.unbind_pointer();
            }
            (_, existing) => state.ws_pointer = existing,
        }

        let has_keyboard = caps.contains(wl_seat::Capability::Keyboard);
        match (has_keyboard, state.ws_keyboard.take()) {
            (true, None) => state.ws_keyboard = Some(seat.get_keyboard(qh, ())),
            (false, Some(keyboard)) => {
                log::debug!("Seat lost its keyboard");
                if can_release(keyboard.version()) {
                    keyboard.release();
                }
            }
            (_, existing) => state.ws_keyboard = existing,
        }
    }
}

impl Dispatch<WlPointer, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        let router = &mut state.ws_router;

        match event {
            wl_pointer::Event::Enter { serial, .. } => router.pointer_enter(serial),
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => router.pointer_motion(time, surface_x, surface_y),
            wl_pointer::Event::Button {
                time,
                button,
                state: WEnum::Value(bstate),
                ..
            } => router.pointer_button(time, button, bstate == wl_pointer::ButtonState::Pressed),
            wl_pointer::Event::Axis {
                time,
                axis: WEnum::Value(wl_pointer::Axis::VerticalScroll),
                value,
            } => router.pointer_axis(time, value),
            _ => {}
        }
    }
}

impl Dispatch<WlKeyboard, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &WlKeyboard,
        event: wl_keyboard::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        // The keymap fd is dropped with the event, we use fixed tables
        if let wl_keyboard::Event::Key {
            time,
            key,
            state: WEnum::Value(kstate),
            ..
        } = event
        {
            state
                .ws_router
                .keyboard_key(time, key, kstate == wl_keyboard::KeyState::Pressed);
        }
    }
}

impl Dispatch<ZwpRelativePointerV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &ZwpRelativePointerV1,
        event: zwp_relative_pointer_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let zwp_relative_pointer_v1::Event::RelativeMotion {
            utime_hi,
            utime_lo,
            dx,
            dy,
            ..
        } = event
        {
            let utime = (utime_hi as u64) << 32 | utime_lo as u64;
            state.ws_router.relative_motion(utime, dx, dy);
        }
    }
}

impl Dispatch<XdgWmBase, ()> for WaylandState {
    fn event(
        _: &mut Self,
        wm_base: &XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<XdgSurface, ()> for WaylandState {
    fn event(
        state: &mut Self,
        xdg_surface: &XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            state.ws_configured = true;
        }
    }
}

delegate_noop!(WaylandState: WlCompositor);
delegate_noop!(WaylandState: WlRegion);
delegate_noop!(WaylandState: ZwpPointerConstraintsV1);
delegate_noop!(WaylandState: ZwpRelativePointerManagerV1);
delegate_noop!(WaylandState: ignore WlShm);
delegate_noop!(WaylandState: ignore WlSurface);
delegate_noop!(WaylandState: ignore XdgToplevel);
delegate_noop!(WaylandState: ignore ZwpLockedPointerV1);
delegate_noop!(WaylandState: ignore ZwpConfinedPointerV1);
