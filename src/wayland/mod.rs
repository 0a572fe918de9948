// The compositor connection
//
// WaylandClient is the production Backend. It owns the connection,
// the event queue, the EGL display, and the cursor theme used to
// restore the pointer image after a lock session.
//
// Austin Shafer - 2020
pub mod dispatch;
pub mod egl;

use crate::config::DriverConfig;
use crate::context::{DriverContext, LockLifetime, PointerMode};
use crate::driver::{Backend, Driver, Host};
use crate::error::{DriverError, Result};
use crate::input::InputRouter;
use crate::msgwait::DisplayPump;
use crate::pointer_lock::LockBackend;
use crate::surface::SurfaceBackend;
use crate::vulkan::{AshVulkan, NativeVulkan};
use dispatch::WaylandState;
use egl::{EglContext, EglDisplay, EglSurface, EglWindow};
use utils::fdwatch::FdWatch;
use utils::log;

use wayland_backend::client::{ReadEventsGuard, WaylandError};
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, EventQueue, Proxy, QueueHandle};
use wayland_cursor::CursorTheme;
use wayland_egl::WlEglSurface;
use wayland_protocols::wp::pointer_constraints::zv1::client::{
    zwp_confined_pointer_v1::ZwpConfinedPointerV1, zwp_locked_pointer_v1::ZwpLockedPointerV1,
    zwp_pointer_constraints_v1::Lifetime,
};
use wayland_protocols::wp::relative_pointer::zv1::client::zwp_relative_pointer_v1::ZwpRelativePointerV1;
use wayland_protocols::xdg::shell::client::{xdg_surface::XdgSurface, xdg_toplevel::XdgToplevel};

use std::io;
use std::os::raw::c_void;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

const CURSOR_NAME: &str = "left_ptr";

/// Turn a client library error into a driver error
fn wl_err<E: std::fmt::Display>(e: E) -> DriverError {
    DriverError::IO(io::Error::new(io::ErrorKind::Other, e.to_string()))
}

/// The xdg objects giving the base surface its toplevel role
pub struct XdgShell {
    xs_surface: XdgSurface,
    xs_toplevel: XdgToplevel,
}

/// The constraint object of a lock session
pub enum Constraint {
    Locked(ZwpLockedPointerV1),
    Confined(ZwpConfinedPointerV1),
}

/// The default cursor image, reattached when a lock session ends
struct CursorImage {
    ci_theme: CursorTheme,
    ci_surface: WlSurface,
}

pub struct WaylandClient {
    wc_conn: Connection,
    wc_queue: EventQueue<WaylandState>,
    wc_qh: QueueHandle<WaylandState>,
    wc_state: WaylandState,
    wc_ctx: Arc<DriverContext>,
    wc_egl: EglDisplay,
    wc_cursor: Option<CursorImage>,
    /// A read started by prepare_read and not finished yet
    wc_read: Option<ReadEventsGuard>,
    wc_watch: FdWatch,
}

// WARNING: the read guard and EGL objects are not Send. The client
// only lives inside the driver lock, so no two threads ever touch it
// at once.
unsafe impl Send for WaylandClient {}

impl WaylandClient {
    /// Connect to the compositor named by the environment and bind
    /// the globals we need
    pub fn connect(ctx: &Arc<DriverContext>, router: InputRouter) -> Result<Self> {
        let conn = Connection::connect_to_env().map_err(|e| {
            log::error!("Could not connect to the compositor: {}", e);
            DriverError::NO_DISPLAY
        })?;

        let mut queue = conn.new_event_queue();
        let qh = queue.handle();
        let _registry = conn.display().get_registry(&qh, ());

        let mut state = WaylandState::new(router);
        // one roundtrip for the globals, one for the seat capabilities
        queue.roundtrip(&mut state).map_err(wl_err)?;
        queue.roundtrip(&mut state).map_err(wl_err)?;

        if state.ws_compositor.is_none() {
            return Err(DriverError::NO_GLOBAL("wl_compositor"));
        }
        if state.ws_wm_base.is_none() {
            return Err(DriverError::NO_GLOBAL("xdg_wm_base"));
        }
        if state.ws_constraints.is_none() {
            log::error!("Compositor has no pointer constraints, pointer locking is disabled");
        }

        let egl = EglDisplay::new(conn.backend().display_ptr() as *mut c_void)?;
        let cursor = Self::load_cursor(&conn, &qh, &state, &ctx.dc_config);

        let mut watch = FdWatch::new();
        watch.add_fd(conn.backend().poll_fd().as_raw_fd());

        log::debug!("Bound compositor globals");
        Ok(Self {
            wc_conn: conn,
            wc_queue: queue,
            wc_qh: qh,
            wc_state: state,
            wc_ctx: ctx.clone(),
            wc_egl: egl,
            wc_cursor: cursor,
            wc_read: None,
            wc_watch: watch,
        })
    }

    fn load_cursor(
        conn: &Connection,
        qh: &QueueHandle<WaylandState>,
        state: &WaylandState,
        config: &DriverConfig,
    ) -> Option<CursorImage> {
        let shm = state.ws_shm.clone()?;
        let compositor = state.ws_compositor.as_ref()?;

        let theme = match config.cursor_theme.as_deref() {
            Some(name) => CursorTheme::load_from_name(conn, shm, name, config.cursor_size),
            None => CursorTheme::load(conn, shm, config.cursor_size),
        };
        match theme {
            Ok(t) => Some(CursorImage {
                ci_theme: t,
                ci_surface: compositor.create_surface(qh, ()),
            }),
            Err(e) => {
                log::error!("Could not load the cursor theme: {}", e);
                None
            }
        }
    }

    fn serial(&self) -> u32 {
        self.wc_ctx.pointer().ps_serial
    }
}

impl DisplayPump for WaylandClient {
    fn prepare_read(&mut self) -> bool {
        match self.wc_queue.prepare_read() {
            Some(guard) => {
                self.wc_read = Some(guard);
                true
            }
            None => false,
        }
    }

    fn read_events(&mut self) -> Result<()> {
        let guard = match self.wc_read.take() {
            Some(g) => g,
            None => return Ok(()),
        };

        // Only read if data is waiting. Dropping the guard cancels.
        if !self.wc_watch.wait_for_events(Some(0)) {
            return Ok(());
        }

        match guard.read() {
            Ok(_) => Ok(()),
            Err(WaylandError::Io(e))
                if e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(())
            }
            Err(e) => Err(wl_err(e)),
        }
    }

    fn cancel_read(&mut self) {
        self.wc_read = None;
    }

    fn dispatch_pending(&mut self) -> Result<usize> {
        self.wc_queue
            .dispatch_pending(&mut self.wc_state)
            .map_err(wl_err)
    }

    fn flush(&mut self) -> Result<()> {
        self.wc_conn.flush().map_err(wl_err)
    }
}

impl SurfaceBackend for WaylandClient {
    type Base = WlSurface;
    type Shell = XdgShell;
    type Window = EglWindow;
    type EglSurface = EglSurface;
    type Context = EglContext;

    fn create_context(&mut self) -> Result<EglContext> {
        self.wc_egl.create_context()
    }

    fn create_base_surface(&mut self) -> Result<WlSurface> {
        let compositor = self
            .wc_state
            .ws_compositor
            .as_ref()
            .ok_or(DriverError::NO_GLOBAL("wl_compositor"))?;

        Ok(compositor.create_surface(&self.wc_qh, ()))
    }

    fn create_shell_surface(&mut self, base: &WlSurface) -> Result<XdgShell> {
        let wm_base = self
            .wc_state
            .ws_wm_base
            .as_ref()
            .ok_or(DriverError::NO_GLOBAL("xdg_wm_base"))?;

        let surface = wm_base.get_xdg_surface(base, &self.wc_qh, ());
        let toplevel = surface.get_toplevel(&self.wc_qh, ());
        toplevel.set_title("waylanddrv".to_string());

        self.wc_state.ws_configured = false;
        base.commit();

        Ok(XdgShell {
            xs_surface: surface,
            xs_toplevel: toplevel,
        })
    }

    fn set_opaque_region(&mut self, base: &WlSurface, width: u32, height: u32) {
        if let Some(compositor) = self.wc_state.ws_compositor.as_ref() {
            let region = compositor.create_region(&self.wc_qh, ());
            region.add(0, 0, width as i32, height as i32);
            base.set_opaque_region(Some(&region));
            region.destroy();
        }
    }

    fn create_native_window(
        &mut self,
        base: &WlSurface,
        width: u32,
        height: u32,
    ) -> Result<EglWindow> {
        WlEglSurface::new(base.id(), width as i32, height as i32)
            .map(EglWindow::new)
            .map_err(|e| DriverError::EGL(e.to_string()))
    }

    fn create_egl_surface(&mut self, context: &EglContext, window: &EglWindow) -> Result<EglSurface> {
        self.wc_egl.create_surface(context, window)
    }

    fn make_current(&mut self, context: &EglContext, egl: &EglSurface) -> Result<()> {
        self.wc_egl.make_current(context, egl)
    }

    fn swap_buffers(&mut self, egl: &EglSurface) -> Result<()> {
        self.wc_egl.swap_buffers(egl)
    }

    fn set_fullscreen(&mut self, shell: &XdgShell) {
        shell.xs_toplevel.set_fullscreen(None);
    }

    fn destroy_egl_surface(&mut self, egl: EglSurface) {
        self.wc_egl.destroy_surface(egl);
    }

    fn destroy_native_window(&mut self, window: EglWindow) {
        drop(window);
    }

    fn destroy_shell_surface(&mut self, shell: XdgShell) {
        shell.xs_toplevel.destroy();
        shell.xs_surface.destroy();
    }

    fn destroy_base_surface(&mut self, base: WlSurface) {
        base.destroy();
    }

    fn destroy_context(&mut self, context: EglContext) {
        self.wc_egl.destroy_context(context);
    }
}

impl LockBackend for WaylandClient {
    type Surface = WlSurface;
    type Constraint = Constraint;
    type Relative = ZwpRelativePointerV1;

    fn create_constraint(
        &mut self,
        surface: &WlSurface,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<Constraint> {
        let pointer = self
            .wc_state
            .ws_pointer
            .as_ref()
            .ok_or(DriverError::NO_POINTER)?;
        let constraints = self
            .wc_state
            .ws_constraints
            .as_ref()
            .ok_or(DriverError::NO_GLOBAL("zwp_pointer_constraints_v1"))?;
        let lifetime = match lifetime {
            LockLifetime::Oneshot => Lifetime::Oneshot,
            LockLifetime::Persistent => Lifetime::Persistent,
        };

        Ok(match mode {
            PointerMode::Locked => Constraint::Locked(constraints.lock_pointer(
                surface,
                pointer,
                None,
                lifetime,
                &self.wc_qh,
                (),
            )),
            _ => Constraint::Confined(constraints.confine_pointer(
                surface,
                pointer,
                None,
                lifetime,
                &self.wc_qh,
                (),
            )),
        })
    }

    fn destroy_constraint(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::Locked(l) => l.destroy(),
            Constraint::Confined(c) => c.destroy(),
        }
    }

    fn create_relative(&mut self) -> Result<ZwpRelativePointerV1> {
        let pointer = self
            .wc_state
            .ws_pointer
            .as_ref()
            .ok_or(DriverError::NO_POINTER)?;
        let manager = self
            .wc_state
            .ws_relative_manager
            .as_ref()
            .ok_or(DriverError::NO_GLOBAL("zwp_relative_pointer_manager_v1"))?;

        Ok(manager.get_relative_pointer(pointer, &self.wc_qh, ()))
    }

    fn destroy_relative(&mut self, relative: ZwpRelativePointerV1) {
        relative.destroy();
    }

    fn commit_surface(&mut self, surface: &WlSurface) {
        surface.commit();
    }

    fn hide_cursor(&mut self) {
        let serial = self.serial();
        if let Some(pointer) = self.wc_state.ws_pointer.as_ref() {
            pointer.set_cursor(serial, None, 0, 0);
        }
    }

    fn restore_cursor(&mut self) {
        let serial = self.serial();
        let pointer = match self.wc_state.ws_pointer.as_ref() {
            Some(p) => p,
            None => return,
        };
        let cursor = match self.wc_cursor.as_mut() {
            Some(c) => c,
            None => return,
        };
        let image = match cursor.ci_theme.get_cursor(CURSOR_NAME) {
            Some(c) => &c[0],
            None => {
                log::error!("Cursor theme has no {} image", CURSOR_NAME);
                return;
            }
        };

        let (hx, hy) = image.hotspot();
        let (w, h) = image.dimensions();
        pointer.set_cursor(serial, Some(&cursor.ci_surface), hx as i32, hy as i32);
        cursor.ci_surface.attach(Some(&**image), 0, 0);
        cursor.ci_surface.damage(0, 0, w as i32, h as i32);
        cursor.ci_surface.commit();
    }
}

impl Backend for WaylandClient {
    fn display_ptr(&self) -> *mut c_void {
        self.wc_conn.backend().display_ptr() as *mut c_void
    }

    fn surface_ptr(&self, base: &WlSurface) -> *mut c_void {
        base.id().as_ptr() as *mut c_void
    }

    fn dispatch_round(&mut self) -> Result<()> {
        self.wc_queue
            .roundtrip(&mut self.wc_state)
            .map(|_| ())
            .map_err(wl_err)
    }

    fn is_realized(&self, _base: &WlSurface) -> bool {
        self.wc_state.ws_configured
    }
}

/// A driver on the compositor named by the environment, using the
/// system vulkan library
pub fn wayland_driver<H: Host>(host: Arc<H>) -> Driver<WaylandClient, H> {
    Driver::new(
        DriverConfig::from_env(),
        host,
        Box::new(WaylandClient::connect),
        Box::new(|config: &DriverConfig| {
            AshVulkan::load(&config.vulkan_libraries).map(|v| Arc::new(v) as Arc<dyn NativeVulkan>)
        }),
    )
}
