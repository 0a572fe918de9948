// The driver facade
//
// Driver ties the components together and owns the one lock that
// serializes the presentation surface, the pointer lock session,
// and the surface handle table. Every host entry point goes
// through here.
//
// Austin Shafer - 2020
use crate::config::DriverConfig;
use crate::context::{lock, DriverContext, Hotkey, LockLifetime, PointerMode};
use crate::error::{DriverError, Result};
use crate::input::hardware::InputInjector;
use crate::input::InputRouter;
use crate::msgwait::{DisplayPump, HostWait};
use crate::pointer_lock::{LockBackend, PointerLock};
use crate::surface::{PresentationSurface, SurfaceBackend};
use crate::vulkan::handle::SurfaceTable;
use crate::vulkan::NativeVulkan;
use crate::windows::HostWindows;
use utils::log;

use once_cell::sync::OnceCell;
use std::os::raw::c_void;
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything the driver needs from the compositor connection
pub trait Backend:
    SurfaceBackend
    + LockBackend<Surface = <Self as SurfaceBackend>::Base>
    + DisplayPump
    + Send
    + 'static
{
    /// The native display pointer handed to vulkan
    fn display_ptr(&self) -> *mut c_void;
    /// The native surface pointer of `base` handed to vulkan
    fn surface_ptr(&self, base: &<Self as SurfaceBackend>::Base) -> *mut c_void;
    /// Block for one roundtrip and dispatch what it brought
    fn dispatch_round(&mut self) -> Result<()>;
    /// Has the compositor configured `base` so it can be drawn to
    fn is_realized(&self, base: &<Self as SurfaceBackend>::Base) -> bool;
}

/// Everything the driver needs from the host runtime
pub trait Host: InputInjector + HostWindows + HostWait + 'static {}

impl<T: InputInjector + HostWindows + HostWait + 'static> Host for T {}

/// Opens the compositor connection. The router receives the
/// connection's input callbacks.
pub type Connector<B> =
    Box<dyn Fn(&Arc<DriverContext>, InputRouter) -> Result<B> + Send + Sync>;

/// Loads the native vulkan library, None if it is not available
pub type VulkanLoader =
    Box<dyn Fn(&DriverConfig) -> Option<Arc<dyn NativeVulkan>> + Send + Sync>;

/// State serialized by the driver lock
pub(crate) struct DriverState<B: Backend> {
    /// None until the first window or surface needs the compositor
    pub(crate) ds_backend: Option<B>,
    pub(crate) ds_surface: Option<PresentationSurface<B>>,
    pub(crate) ds_lock: PointerLock<B>,
    pub(crate) ds_handles: SurfaceTable,
}

pub struct Driver<B: Backend, H: Host> {
    pub(crate) d_ctx: Arc<DriverContext>,
    pub(crate) d_host: Arc<H>,
    pub(crate) d_state: Mutex<DriverState<B>>,
    d_connector: Connector<B>,
    pub(crate) d_vulkan: OnceCell<Option<Arc<dyn NativeVulkan>>>,
    pub(crate) d_vulkan_loader: VulkanLoader,
}

impl<B: Backend, H: Host> Driver<B, H> {
    pub fn new(
        config: DriverConfig,
        host: Arc<H>,
        connector: Connector<B>,
        vulkan: VulkanLoader,
    ) -> Self {
        Self::with_context(Arc::new(DriverContext::new(config)), host, connector, vulkan)
    }

    pub fn with_context(
        ctx: Arc<DriverContext>,
        host: Arc<H>,
        connector: Connector<B>,
        vulkan: VulkanLoader,
    ) -> Self {
        Self {
            d_ctx: ctx,
            d_host: host,
            d_state: Mutex::new(DriverState {
                ds_backend: None,
                ds_surface: None,
                ds_lock: PointerLock::new(),
                ds_handles: SurfaceTable::new(),
            }),
            d_connector: connector,
            d_vulkan: OnceCell::new(),
            d_vulkan_loader: vulkan,
        }
    }

    pub fn context(&self) -> &Arc<DriverContext> {
        &self.d_ctx
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, DriverState<B>> {
        lock(&self.d_state)
    }

    pub fn is_connected(&self) -> bool {
        self.state().ds_backend.is_some()
    }

    pub fn has_presentation_surface(&self) -> bool {
        self.state().ds_surface.is_some()
    }

    /// Current pointer lock mode of the active session
    pub fn pointer_lock_mode(&self) -> PointerMode {
        self.state().ds_lock.mode()
    }

    /// Open the compositor connection if it is not already open.
    ///
    /// The calling thread becomes the only thread that dispatches
    /// compositor events.
    pub(crate) fn connect_once(&self, st: &mut DriverState<B>) -> Result<()> {
        if st.ds_backend.is_some() {
            return Ok(());
        }

        let injector: Arc<dyn InputInjector> = self.d_host.clone();
        let router = InputRouter::new(self.d_ctx.clone(), injector);
        let backend = (self.d_connector)(&self.d_ctx, router)?;

        self.d_ctx.claim_dispatch_thread();
        st.ds_backend = Some(backend);
        log::debug!("Connected to the compositor");

        Ok(())
    }

    /// Tear down the presentation surface and any lock session on it
    pub(crate) fn destroy_presentation(&self, st: &mut DriverState<B>) {
        let surface = match st.ds_surface.take() {
            Some(s) => s,
            None => return,
        };
        // a surface cannot exist without the connection it came from
        let backend = match st.ds_backend.as_mut() {
            Some(b) => b,
            None => return,
        };

        st.ds_lock.release(backend, &self.d_ctx);
        surface.destroy(backend);
    }

    /// Apply the hotkeys queued by the last dispatch
    pub(crate) fn apply_hotkeys(&self) {
        let keys = self.d_ctx.take_hotkeys();
        if keys.is_empty() {
            return;
        }

        let ctx = &self.d_ctx;
        let mut st = self.state();
        let st = &mut *st;
        let (backend, surface) = match (st.ds_backend.as_mut(), st.ds_surface.as_mut()) {
            (Some(b), Some(s)) => (b, s),
            _ => {
                log::debug!("Ignoring hotkeys {:?} without a presentation surface", keys);
                return;
            }
        };

        for key in keys {
            let res = match key {
                Hotkey::Fullscreen => {
                    if surface.request_fullscreen(backend) {
                        log::debug!("Presentation surface set fullscreen");
                    }
                    Ok(())
                }
                Hotkey::ToggleConfine => st.ds_lock.toggle(
                    backend,
                    surface.base(),
                    ctx,
                    PointerMode::Confined,
                    LockLifetime::Persistent,
                ),
                Hotkey::ToggleLock => st.ds_lock.toggle(
                    backend,
                    surface.base(),
                    ctx,
                    PointerMode::Locked,
                    LockLifetime::Oneshot,
                ),
            };

            if let Err(e) = res {
                log::error!("Could not apply hotkey {:?}: {}", key, e);
            }
        }
    }

    /// Run one dispatch on the compositor connection and apply any
    /// hotkeys it delivered. Only the dispatch thread may call this.
    pub fn dispatch(&self) -> Result<usize> {
        if !self.d_ctx.is_dispatch_thread() {
            return Ok(0);
        }

        let count = {
            let mut st = self.state();
            let backend = st.ds_backend.as_mut().ok_or(DriverError::NO_DISPLAY)?;
            backend.dispatch_pending()?
        };

        self.apply_hotkeys();
        Ok(count)
    }
}
