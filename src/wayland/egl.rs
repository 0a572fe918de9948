// EGL state for the presentation surface
//
// The surface needs a GL context and window surface bound to it
// before the compositor will map it. Nothing is drawn with GL, we
// only swap once so a buffer is attached.
//
// Austin Shafer - 2020
use crate::error::{DriverError, Result};
use khronos_egl as egl;
use utils::log;
use wayland_egl::WlEglSurface;

use std::os::raw::c_void;

fn egl_err(what: &str, e: egl::Error) -> DriverError {
    DriverError::EGL(format!("{}: {}", what, e))
}

/// The EGL display for our compositor connection
pub struct EglDisplay {
    ed_egl: egl::Instance<egl::Static>,
    ed_display: egl::Display,
}

// WARNING: EGL handles are plain pointers and not Send. The display
// is only used while the driver lock is held, which serializes all
// access to it.
unsafe impl Send for EglDisplay {}

/// A GL context and the config it was chosen with
pub struct EglContext {
    ec_config: egl::Config,
    ec_context: egl::Context,
}

// WARNING: see EglDisplay
unsafe impl Send for EglContext {}

pub struct EglSurface(egl::Surface);

// WARNING: see EglDisplay
unsafe impl Send for EglSurface {}

/// The wl_egl_window wrapping our base surface
pub struct EglWindow(WlEglSurface);

// WARNING: the wl_egl_window is only touched with the driver lock
// held, and is destroyed before the surface it wraps.
unsafe impl Send for EglWindow {}

impl EglWindow {
    pub fn new(surface: WlEglSurface) -> Self {
        Self(surface)
    }
}

impl EglDisplay {
    /// Initialize EGL on the native display `display`
    pub fn new(display: *mut c_void) -> Result<Self> {
        let egl = egl::Instance::new(egl::Static);

        // The display pointer is the live connection's wl_display
        let dpy = unsafe { egl.get_display(display as egl::NativeDisplayType) }
            .ok_or_else(|| DriverError::EGL("no display for the connection".to_string()))?;
        let (major, minor) = egl
            .initialize(dpy)
            .map_err(|e| egl_err("initialize", e))?;
        egl.bind_api(egl::OPENGL_ES_API)
            .map_err(|e| egl_err("bind_api", e))?;

        log::debug!("Initialized EGL {}.{}", major, minor);
        Ok(Self {
            ed_egl: egl,
            ed_display: dpy,
        })
    }

    pub fn create_context(&self) -> Result<EglContext> {
        let attrs = [
            egl::SURFACE_TYPE,
            egl::WINDOW_BIT,
            egl::RED_SIZE,
            8,
            egl::GREEN_SIZE,
            8,
            egl::BLUE_SIZE,
            8,
            egl::RENDERABLE_TYPE,
            egl::OPENGL_ES2_BIT,
            egl::NONE,
        ];
        let config = self
            .ed_egl
            .choose_first_config(self.ed_display, &attrs)
            .map_err(|e| egl_err("choose_config", e))?
            .ok_or_else(|| DriverError::EGL("no matching config".to_string()))?;

        let ctx_attrs = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        let context = self
            .ed_egl
            .create_context(self.ed_display, config, None, &ctx_attrs)
            .map_err(|e| egl_err("create_context", e))?;

        Ok(EglContext {
            ec_config: config,
            ec_context: context,
        })
    }

    pub fn create_surface(&self, ctx: &EglContext, window: &EglWindow) -> Result<EglSurface> {
        // The window outlives the surface, destroy_surface is always
        // called before the window is dropped
        let surface = unsafe {
            self.ed_egl.create_window_surface(
                self.ed_display,
                ctx.ec_config,
                window.0.ptr() as egl::NativeWindowType,
                None,
            )
        }
        .map_err(|e| egl_err("create_window_surface", e))?;

        Ok(EglSurface(surface))
    }

    pub fn make_current(&self, ctx: &EglContext, surface: &EglSurface) -> Result<()> {
        self.ed_egl
            .make_current(
                self.ed_display,
                Some(surface.0),
                Some(surface.0),
                Some(ctx.ec_context),
            )
            .map_err(|e| egl_err("make_current", e))
    }

    pub fn swap_buffers(&self, surface: &EglSurface) -> Result<()> {
        self.ed_egl
            .swap_buffers(self.ed_display, surface.0)
            .map_err(|e| egl_err("swap_buffers", e))
    }

    pub fn destroy_surface(&self, surface: EglSurface) {
        if let Err(e) = self.ed_egl.destroy_surface(self.ed_display, surface.0) {
            log::error!("Could not destroy EGL surface: {}", e);
        }
    }

    pub fn destroy_context(&self, ctx: EglContext) {
        // Only unbinds this thread. If another thread still has the
        // context current, EGL defers freeing it until that binding goes.
        if let Err(e) = self
            .ed_egl
            .make_current(self.ed_display, None, None, None)
        {
            log::error!("Could not release the current EGL context: {}", e);
        }
        if let Err(e) = self.ed_egl.destroy_context(self.ed_display, ctx.ec_context) {
            log::error!("Could not destroy EGL context: {}", e);
        }
    }
}

impl Drop for EglDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.ed_egl.terminate(self.ed_display) {
            log::error!("Could not terminate EGL: {}", e);
        }
    }
}
