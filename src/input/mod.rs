// The input routing engine
//
// Compositor pointer and keyboard callbacks land here. We decide
// which target window should see them, turn them into hardware
// input records, and hand them to the host's injection channel.
//
// Every callback produces at most one hardware input record, and
// records go out in the order the callbacks arrive.
//
// Austin Shafer - 2020
pub mod codes;
pub mod hardware;

use crate::context::{DriverContext, Hotkey, Hwnd, PointerMode, NO_WINDOW};
use crate::keycodes;
use codes::*;
use hardware::*;
use utils::log;

use std::sync::Arc;

/// Where pointer events go and how their coordinates are reported
///
/// One of these is chosen when the seat's pointer shows up and is
/// used for the lifetime of that pointer.
pub trait PointerSink: Send {
    fn name(&self) -> &'static str;

    /// The window that receives this sink's events
    fn target(&self, ctx: &DriverContext, injector: &dyn InputInjector) -> Hwnd;

    /// Turn an absolute surface position into a mouse record.
    /// None means the motion is not reported.
    fn motion(&self, ctx: &DriverContext, x: i32, y: i32) -> Option<MouseInput>;
}

/// Base mouse record for buttons and wheel events
///
/// Free pointers carry the last position so the host sees the
/// position and button atomically. Constrained pointers carry no
/// position at all.
fn positioned_record(ctx: &DriverContext) -> MouseInput {
    let ptr = ctx.pointer();

    match ptr.ps_mode {
        PointerMode::Free => MouseInput {
            mi_dx: ptr.ps_last_x,
            mi_dy: ptr.ps_last_y,
            mi_data: 0,
            mi_flags: MouseFlags::MOVE | MouseFlags::ABSOLUTE,
            mi_time: 0,
        },
        _ => MouseInput {
            mi_dx: 0,
            mi_dy: 0,
            mi_data: 0,
            mi_flags: MouseFlags::empty(),
            mi_time: 0,
        },
    }
}

/// Used while a GPU presentation window exists
///
/// Everything goes to the presentation window. Confined pointers
/// report deltas from the last known position.
pub struct GpuPointerSink;

impl PointerSink for GpuPointerSink {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn target(&self, ctx: &DriverContext, _injector: &dyn InputInjector) -> Hwnd {
        ctx.gpu_window()
    }

    fn motion(&self, ctx: &DriverContext, x: i32, y: i32) -> Option<MouseInput> {
        let mut ptr = ctx.pointer();
        // only the relative pointer reports motion while locked
        if ptr.ps_mode == PointerMode::Locked {
            return None;
        }

        let last = match ptr.ps_has_position {
            true => Some((ptr.ps_last_x, ptr.ps_last_y)),
            false => None,
        };
        ptr.ps_last_x = x;
        ptr.ps_last_y = y;
        ptr.ps_has_position = true;

        match ptr.ps_mode {
            PointerMode::Confined => {
                // the first position only sets the origin for deltas
                let (last_x, last_y) = last?;
                Some(MouseInput {
                    mi_dx: x - last_x,
                    mi_dy: y - last_y,
                    mi_data: 0,
                    mi_flags: MouseFlags::MOVE,
                    mi_time: 0,
                })
            }
            _ => Some(MouseInput {
                mi_dx: x,
                mi_dy: y,
                mi_data: 0,
                mi_flags: MouseFlags::MOVE | MouseFlags::ABSOLUTE,
                mi_time: 0,
            }),
        }
    }
}

/// Used for ordinary windowed applications
///
/// Events go to the focus window, or the foreground window if we
/// are not tracking one. Positions are always absolute.
pub struct GenericPointerSink;

impl PointerSink for GenericPointerSink {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn target(&self, ctx: &DriverContext, injector: &dyn InputInjector) -> Hwnd {
        match ctx.focus_window() {
            NO_WINDOW => injector.foreground_window(),
            hwnd => hwnd,
        }
    }

    fn motion(&self, ctx: &DriverContext, x: i32, y: i32) -> Option<MouseInput> {
        let mut ptr = ctx.pointer();
        if ptr.ps_mode == PointerMode::Locked {
            return None;
        }

        ptr.ps_last_x = x;
        ptr.ps_last_y = y;
        ptr.ps_has_position = true;

        Some(MouseInput {
            mi_dx: x,
            mi_dy: y,
            mi_data: 0,
            mi_flags: MouseFlags::MOVE | MouseFlags::ABSOLUTE,
            mi_time: 0,
        })
    }
}

pub struct InputRouter {
    ir_ctx: Arc<DriverContext>,
    ir_injector: Arc<dyn InputInjector>,
    /// Chosen when the pointer capability is bound
    ir_sink: Option<Box<dyn PointerSink>>,
}

impl InputRouter {
    pub fn new(ctx: Arc<DriverContext>, injector: Arc<dyn InputInjector>) -> Self {
        Self {
            ir_ctx: ctx,
            ir_injector: injector,
            ir_sink: None,
        }
    }

    /// The pointer capability appeared, pick how pointer events are routed
    pub fn bind_pointer(&mut self) {
        let sink: Box<dyn PointerSink> =
            match self.ir_ctx.dc_config.gpu_only || self.ir_ctx.gpu_active() {
                true => Box::new(GpuPointerSink),
                false => Box::new(GenericPointerSink),
            };

        log::debug!("Binding the {} pointer sink", sink.name());
        self.ir_sink = Some(sink);
    }

    pub fn unbind_pointer(&mut self) {
        self.ir_sink = None;
    }

    pub fn pointer_sink_name(&self) -> Option<&'static str> {
        self.ir_sink.as_ref().map(|s| s.name())
    }

    fn submit_mouse(&self, hwnd: Hwnd, mut input: MouseInput, time: u32) {
        input.mi_time = self.ir_ctx.reconcile_time(time);
        self.ir_injector
            .send_hardware_input(hwnd, &HardwareInput::Mouse(input));
    }

    /// Remember the enter serial, it is needed to change the cursor
    pub fn pointer_enter(&mut self, serial: u32) {
        self.ir_ctx.pointer().ps_serial = serial;
    }

    /// Pointer motion in surface local coordinates
    pub fn pointer_motion(&mut self, time: u32, x: f64, y: f64) {
        let sink = match self.ir_sink.as_ref() {
            Some(s) => s,
            None => return,
        };

        if let Some(input) = sink.motion(&self.ir_ctx, x as i32, y as i32) {
            let hwnd = sink.target(&self.ir_ctx, self.ir_injector.as_ref());
            self.submit_mouse(hwnd, input, time);
        }
    }

    pub fn pointer_button(&mut self, time: u32, button: u32, pressed: bool) {
        let sink = match self.ir_sink.as_ref() {
            Some(s) => s,
            None => return,
        };

        let flag = match (button, pressed) {
            (BTN_LEFT, true) => MouseFlags::LEFTDOWN,
            (BTN_LEFT, false) => MouseFlags::LEFTUP,
            (BTN_RIGHT, true) => MouseFlags::RIGHTDOWN,
            (BTN_RIGHT, false) => MouseFlags::RIGHTUP,
            (BTN_MIDDLE, true) => MouseFlags::MIDDLEDOWN,
            (BTN_MIDDLE, false) => MouseFlags::MIDDLEUP,
            _ => return,
        };

        let mut input = positioned_record(&self.ir_ctx);
        input.mi_flags |= flag;

        let hwnd = sink.target(&self.ir_ctx, self.ir_injector.as_ref());
        self.submit_mouse(hwnd, input, time);
    }

    /// Vertical scroll. Each callback is one wheel notch.
    pub fn pointer_axis(&mut self, time: u32, value: f64) {
        let sink = match self.ir_sink.as_ref() {
            Some(s) => s,
            None => return,
        };

        let mut input = positioned_record(&self.ir_ctx);
        input.mi_flags |= MouseFlags::WHEEL;
        input.mi_data = match value > 0.0 {
            true => -WHEEL_DELTA,
            false => WHEEL_DELTA,
        };

        let hwnd = sink.target(&self.ir_ctx, self.ir_injector.as_ref());
        self.submit_mouse(hwnd, input, time);
    }

    /// Motion from the relative pointer of a lock session
    ///
    /// `utime` is in microseconds. Deltas only go out while locked,
    /// a confined pointer already reports them through `pointer_motion`.
    pub fn relative_motion(&mut self, utime: u64, dx: f64, dy: f64) {
        if self.ir_ctx.pointer_mode() != PointerMode::Locked {
            return;
        }

        let input = MouseInput {
            mi_dx: dx as i32,
            mi_dy: dy as i32,
            mi_data: 0,
            mi_flags: MouseFlags::MOVE,
            mi_time: 0,
        };
        self.submit_mouse(self.ir_ctx.gpu_window(), input, (utime / 1000) as u32);
    }

    /// A key changed state
    ///
    /// Returns the hotkey this release triggered, which has also been
    /// queued on the context for the driver to apply.
    pub fn keyboard_key(&mut self, time: u32, key: u32, pressed: bool) -> Option<Hotkey> {
        let vkey = keycodes::scancode_to_virtual_key(key);
        if vkey == 0 {
            log::info!("Dropping unmapped key {}", key);
            return None;
        }

        let scan = keycodes::virtual_key_to_target_scancode(vkey);
        let mut flags = KeyFlags::empty();
        if keycodes::is_extended(scan) {
            flags |= KeyFlags::EXTENDEDKEY;
        }
        if !pressed {
            flags |= KeyFlags::KEYUP;
        }

        let hwnd = match self.ir_ctx.gpu_window() {
            NO_WINDOW => self.ir_ctx.focus_window(),
            gpu => gpu,
        };

        let input = KeyboardInput {
            ki_vkey: vkey,
            ki_scan: scan,
            ki_flags: flags,
            ki_time: self.ir_ctx.reconcile_time(time),
        };
        self.ir_injector
            .send_hardware_input(hwnd, &HardwareInput::Keyboard(input));

        if pressed {
            return None;
        }

        let hotkey = match key {
            KEY_F11 => Hotkey::Fullscreen,
            KEY_F10 => Hotkey::ToggleConfine,
            KEY_F9 => Hotkey::ToggleLock,
            _ => return None,
        };
        self.ir_ctx.queue_hotkey(hotkey);

        return Some(hotkey);
    }
}
