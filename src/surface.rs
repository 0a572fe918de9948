// The presentation surface
//
// A GPU swapchain presents into a compositor surface that we back
// with an EGL window surface and GL context. There is at most one
// of these; replacing it means destroying the old one completely
// before the new one is made.
//
// Austin Shafer - 2020
use crate::error::Result;
use utils::log;
use utils::timing::StopWatch;

/// The compositor and EGL operations needed to build a presentation
/// surface, one object at a time
pub trait SurfaceBackend {
    /// The compositor's base surface object
    type Base: Send;
    /// The shell role object making the base surface a toplevel
    type Shell: Send;
    /// The native window wrapper EGL renders through
    type Window: Send;
    type EglSurface: Send;
    type Context: Send;

    fn create_context(&mut self) -> Result<Self::Context>;
    fn create_base_surface(&mut self) -> Result<Self::Base>;
    fn create_shell_surface(&mut self, base: &Self::Base) -> Result<Self::Shell>;
    /// Tell the compositor nothing below this area needs to be drawn
    fn set_opaque_region(&mut self, base: &Self::Base, width: u32, height: u32);
    fn create_native_window(
        &mut self,
        base: &Self::Base,
        width: u32,
        height: u32,
    ) -> Result<Self::Window>;
    fn create_egl_surface(
        &mut self,
        context: &Self::Context,
        window: &Self::Window,
    ) -> Result<Self::EglSurface>;
    fn make_current(&mut self, context: &Self::Context, egl: &Self::EglSurface) -> Result<()>;
    fn swap_buffers(&mut self, egl: &Self::EglSurface) -> Result<()>;
    fn set_fullscreen(&mut self, shell: &Self::Shell);

    fn destroy_egl_surface(&mut self, egl: Self::EglSurface);
    fn destroy_native_window(&mut self, window: Self::Window);
    fn destroy_shell_surface(&mut self, shell: Self::Shell);
    fn destroy_base_surface(&mut self, base: Self::Base);
    fn destroy_context(&mut self, context: Self::Context);
}

/// The single presentation surface and its EGL state
pub struct PresentationSurface<B: SurfaceBackend> {
    ps_context: B::Context,
    ps_base: B::Base,
    ps_shell: B::Shell,
    ps_window: B::Window,
    ps_egl: B::EglSurface,
    ps_extent: (u32, u32),
    /// fullscreen is only ever requested once per surface
    ps_fullscreen: bool,
}

impl<B: SurfaceBackend> PresentationSurface<B> {
    /// Build a new surface of `width` by `height`
    ///
    /// The caller must have destroyed any previous surface. If any
    /// step fails, everything made so far is released again.
    pub fn create(backend: &mut B, width: u32, height: u32) -> Result<Self> {
        let mut stop = StopWatch::new();
        stop.start();

        let context = backend.create_context()?;
        let base = match backend.create_base_surface() {
            Ok(b) => b,
            Err(e) => {
                backend.destroy_context(context);
                return Err(e);
            }
        };
        let shell = match backend.create_shell_surface(&base) {
            Ok(s) => s,
            Err(e) => {
                backend.destroy_base_surface(base);
                backend.destroy_context(context);
                return Err(e);
            }
        };
        backend.set_opaque_region(&base, width, height);

        let window = match backend.create_native_window(&base, width, height) {
            Ok(w) => w,
            Err(e) => {
                backend.destroy_shell_surface(shell);
                backend.destroy_base_surface(base);
                backend.destroy_context(context);
                return Err(e);
            }
        };
        let egl = match backend.create_egl_surface(&context, &window) {
            Ok(s) => s,
            Err(e) => {
                backend.destroy_native_window(window);
                backend.destroy_shell_surface(shell);
                backend.destroy_base_surface(base);
                backend.destroy_context(context);
                return Err(e);
            }
        };

        let ret = Self {
            ps_context: context,
            ps_base: base,
            ps_shell: shell,
            ps_window: window,
            ps_egl: egl,
            ps_extent: (width, height),
            ps_fullscreen: false,
        };

        if let Err(e) = backend.make_current(&ret.ps_context, &ret.ps_egl) {
            ret.destroy(backend);
            return Err(e);
        }

        stop.end();
        log::debug!("Created {}x{} presentation surface", width, height);
        log::profiling!(
            "Presentation surface creation took {} ms",
            stop.get_duration().as_millis()
        );

        Ok(ret)
    }

    /// Tear everything down: EGL surface, native window, shell
    /// surface, base surface, and the context last.
    pub fn destroy(self, backend: &mut B) {
        backend.destroy_egl_surface(self.ps_egl);
        backend.destroy_native_window(self.ps_window);
        backend.destroy_shell_surface(self.ps_shell);
        backend.destroy_base_surface(self.ps_base);
        backend.destroy_context(self.ps_context);
        log::debug!("Destroyed presentation surface");
    }

    pub fn base(&self) -> &B::Base {
        &self.ps_base
    }

    pub fn extent(&self) -> (u32, u32) {
        self.ps_extent
    }

    pub fn swap_buffers(&self, backend: &mut B) -> Result<()> {
        backend.swap_buffers(&self.ps_egl)
    }

    /// Ask for fullscreen. Later calls for the same surface do nothing.
    pub fn request_fullscreen(&mut self, backend: &mut B) -> bool {
        if self.ps_fullscreen {
            return false;
        }

        backend.set_fullscreen(&self.ps_shell);
        self.ps_fullscreen = true;
        return true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    /// Logs every call, and fails the step named in `fail_at`
    #[derive(Default)]
    struct Backend {
        log: Vec<&'static str>,
        fail_at: Option<&'static str>,
    }

    impl Backend {
        fn step(&mut self, name: &'static str) -> Result<()> {
            if self.fail_at == Some(name) {
                return Err(DriverError::EGL(name.to_string()));
            }
            self.log.push(name);
            Ok(())
        }
    }

    impl SurfaceBackend for Backend {
        type Base = ();
        type Shell = ();
        type Window = ();
        type EglSurface = ();
        type Context = ();

        fn create_context(&mut self) -> Result<()> {
            self.step("context")
        }
        fn create_base_surface(&mut self) -> Result<()> {
            self.step("base")
        }
        fn create_shell_surface(&mut self, _: &()) -> Result<()> {
            self.step("shell")
        }
        fn set_opaque_region(&mut self, _: &(), _: u32, _: u32) {
            self.log.push("opaque");
        }
        fn create_native_window(&mut self, _: &(), _: u32, _: u32) -> Result<()> {
            self.step("window")
        }
        fn create_egl_surface(&mut self, _: &(), _: &()) -> Result<()> {
            self.step("egl")
        }
        fn make_current(&mut self, _: &(), _: &()) -> Result<()> {
            self.step("current")
        }
        fn swap_buffers(&mut self, _: &()) -> Result<()> {
            self.step("swap")
        }
        fn set_fullscreen(&mut self, _: &()) {
            self.log.push("fullscreen");
        }
        fn destroy_egl_surface(&mut self, _: ()) {
            self.log.push("~egl");
        }
        fn destroy_native_window(&mut self, _: ()) {
            self.log.push("~window");
        }
        fn destroy_shell_surface(&mut self, _: ()) {
            self.log.push("~shell");
        }
        fn destroy_base_surface(&mut self, _: ()) {
            self.log.push("~base");
        }
        fn destroy_context(&mut self, _: ()) {
            self.log.push("~context");
        }
    }

    #[test]
    fn create_then_destroy_order() {
        let mut be = Backend::default();
        let surf = PresentationSurface::create(&mut be, 640, 480).unwrap();
        assert_eq!(surf.extent(), (640, 480));
        surf.destroy(&mut be);

        assert_eq!(
            be.log,
            vec![
                "context", "base", "shell", "opaque", "window", "egl", "current", "~egl",
                "~window", "~shell", "~base", "~context",
            ]
        );
    }

    #[test]
    fn partial_failure_releases_what_was_made() {
        let mut be = Backend::default();
        be.fail_at = Some("egl");
        assert!(PresentationSurface::create(&mut be, 10, 10).is_err());
        assert_eq!(
            be.log,
            vec!["context", "base", "shell", "opaque", "window", "~window", "~shell", "~base", "~context"]
        );

        let mut be = Backend::default();
        be.fail_at = Some("current");
        assert!(PresentationSurface::create(&mut be, 10, 10).is_err());
        assert_eq!(be.log.last(), Some(&"~context"));
        assert_eq!(be.log.iter().filter(|s| s.starts_with('~')).count(), 5);
    }

    #[test]
    fn fullscreen_once() {
        let mut be = Backend::default();
        let mut surf = PresentationSurface::create(&mut be, 10, 10).unwrap();
        assert!(surf.request_fullscreen(&mut be));
        assert!(!surf.request_fullscreen(&mut be));
        assert_eq!(be.log.iter().filter(|s| **s == "fullscreen").count(), 1);
    }
}
