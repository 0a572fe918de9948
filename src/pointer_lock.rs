// Pointer confinement and locking
//
// A lock session is the pair of compositor objects that hold the
// pointer: the constraint (confined or locked pointer) and the
// relative pointer that reports raw motion. The pair is created
// together and destroyed together, so it lives in a single value
// that is consumed when released.
//
// Austin Shafer - 2020
use crate::context::{DriverContext, LockLifetime, PointerMode};
use crate::error::Result;
use utils::log;

/// The compositor operations a lock session needs
pub trait LockBackend {
    /// The surface the pointer is held to
    type Surface;
    type Constraint: Send;
    type Relative: Send;

    /// Confine or lock the pointer to `surface`
    fn create_constraint(
        &mut self,
        surface: &Self::Surface,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<Self::Constraint>;
    fn destroy_constraint(&mut self, constraint: Self::Constraint);

    /// Start receiving relative motion
    fn create_relative(&mut self) -> Result<Self::Relative>;
    fn destroy_relative(&mut self, relative: Self::Relative);

    fn commit_surface(&mut self, surface: &Self::Surface);

    /// Clear the cursor image while the pointer is over our surface
    fn hide_cursor(&mut self);
    /// Put the default cursor image back
    fn restore_cursor(&mut self);
}

pub struct PointerLockSession<B: LockBackend> {
    pls_constraint: B::Constraint,
    pls_relative: B::Relative,
    pls_mode: PointerMode,
}

impl<B: LockBackend> PointerLockSession<B> {
    fn create(
        backend: &mut B,
        surface: &B::Surface,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<Self> {
        let constraint = backend.create_constraint(surface, mode, lifetime)?;
        let relative = match backend.create_relative() {
            Ok(r) => r,
            Err(e) => {
                backend.destroy_constraint(constraint);
                return Err(e);
            }
        };

        Ok(Self {
            pls_constraint: constraint,
            pls_relative: relative,
            pls_mode: mode,
        })
    }

    /// Tear down both objects, constraint first
    fn destroy(self, backend: &mut B) {
        backend.destroy_constraint(self.pls_constraint);
        backend.destroy_relative(self.pls_relative);
    }
}

/// The pointer lock state machine
///
/// Free when there is no session, otherwise in the session's mode.
pub struct PointerLock<B: LockBackend> {
    pl_session: Option<PointerLockSession<B>>,
}

impl<B: LockBackend> PointerLock<B> {
    pub fn new() -> Self {
        Self { pl_session: None }
    }

    pub fn is_active(&self) -> bool {
        self.pl_session.is_some()
    }

    pub fn mode(&self) -> PointerMode {
        match self.pl_session.as_ref() {
            Some(s) => s.pls_mode,
            None => PointerMode::Free,
        }
    }

    /// Start a session on `surface`. Does nothing if one is already
    /// active.
    pub fn engage(
        &mut self,
        backend: &mut B,
        surface: &B::Surface,
        ctx: &DriverContext,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<()> {
        if mode == PointerMode::Free || self.pl_session.is_some() {
            return Ok(());
        }

        let session = PointerLockSession::create(backend, surface, mode, lifetime)?;
        backend.commit_surface(surface);
        if !ctx.dc_config.keep_cursor_visible {
            backend.hide_cursor();
        }

        self.pl_session = Some(session);
        ctx.set_pointer_mode(mode);
        log::debug!("Pointer {:?} -> {:?} ({:?})", PointerMode::Free, mode, lifetime);

        Ok(())
    }

    /// End the active session, if any.
    ///
    /// Returns false if there was nothing to release. Calling this
    /// twice is harmless.
    pub fn release(&mut self, backend: &mut B, ctx: &DriverContext) -> bool {
        let session = match self.pl_session.take() {
            Some(s) => s,
            None => return false,
        };

        let mode = session.pls_mode;
        session.destroy(backend);
        ctx.set_pointer_mode(PointerMode::Free);

        if !ctx.dc_config.hide_cursor {
            backend.restore_cursor();
        }
        log::debug!("Pointer {:?} -> {:?}", mode, PointerMode::Free);

        return true;
    }

    /// Hotkey behavior: release if held, otherwise engage `mode`
    pub fn toggle(
        &mut self,
        backend: &mut B,
        surface: &B::Surface,
        ctx: &DriverContext,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<()> {
        if self.release(backend, ctx) {
            return Ok(());
        }

        self.engage(backend, surface, ctx, mode, lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::error::DriverError;

    /// Records every call and tracks which objects are alive
    #[derive(Default)]
    struct Backend {
        calls: Vec<String>,
        next_id: u32,
        live: Vec<u32>,
        fail_relative: bool,
    }

    impl LockBackend for Backend {
        type Surface = ();
        type Constraint = u32;
        type Relative = u32;

        fn create_constraint(
            &mut self,
            _s: &(),
            mode: PointerMode,
            _l: LockLifetime,
        ) -> Result<u32> {
            self.next_id += 1;
            self.live.push(self.next_id);
            self.calls.push(format!("constraint {:?}", mode));
            Ok(self.next_id)
        }

        fn destroy_constraint(&mut self, c: u32) {
            assert!(self.live.contains(&c), "double destroy of {}", c);
            self.live.retain(|x| *x != c);
            self.calls.push("destroy constraint".to_string());
        }

        fn create_relative(&mut self) -> Result<u32> {
            if self.fail_relative {
                return Err(DriverError::NO_GLOBAL("zwp_relative_pointer_manager_v1"));
            }
            self.next_id += 1;
            self.live.push(self.next_id);
            self.calls.push("relative".to_string());
            Ok(self.next_id)
        }

        fn destroy_relative(&mut self, r: u32) {
            assert!(self.live.contains(&r), "double destroy of {}", r);
            self.live.retain(|x| *x != r);
            self.calls.push("destroy relative".to_string());
        }

        fn commit_surface(&mut self, _s: &()) {
            self.calls.push("commit".to_string());
        }

        fn hide_cursor(&mut self) {
            self.calls.push("hide".to_string());
        }

        fn restore_cursor(&mut self) {
            self.calls.push("restore".to_string());
        }
    }

    fn ctx_with(cfg: DriverConfig) -> DriverContext {
        DriverContext::new(cfg)
    }

    #[test]
    fn confine_release_cycle() {
        let ctx = ctx_with(DriverConfig::default());
        let mut be = Backend::default();
        let mut lock = PointerLock::new();

        lock.engage(&mut be, &(), &ctx, PointerMode::Confined, LockLifetime::Persistent)
            .unwrap();
        assert!(lock.is_active());
        assert_eq!(ctx.pointer_mode(), PointerMode::Confined);
        assert_eq!(be.live.len(), 2);

        assert!(lock.release(&mut be, &ctx));
        assert!(!lock.is_active());
        assert!(be.live.is_empty());
        assert_eq!(ctx.pointer_mode(), PointerMode::Free);

        // second release is a no-op
        assert!(!lock.release(&mut be, &ctx));

        assert_eq!(
            be.calls,
            vec![
                "constraint Confined",
                "relative",
                "commit",
                "hide",
                "destroy constraint",
                "destroy relative",
                "restore",
            ]
        );
    }

    #[test]
    fn engage_while_active_keeps_session() {
        let ctx = ctx_with(DriverConfig::default());
        let mut be = Backend::default();
        let mut lock = PointerLock::new();

        lock.engage(&mut be, &(), &ctx, PointerMode::Locked, LockLifetime::Oneshot)
            .unwrap();
        lock.engage(&mut be, &(), &ctx, PointerMode::Confined, LockLifetime::Persistent)
            .unwrap();
        assert_eq!(lock.mode(), PointerMode::Locked);
        assert_eq!(be.live.len(), 2);
    }

    #[test]
    fn toggle_flips() {
        let ctx = ctx_with(DriverConfig::default());
        let mut be = Backend::default();
        let mut lock = PointerLock::new();

        lock.toggle(&mut be, &(), &ctx, PointerMode::Locked, LockLifetime::Oneshot)
            .unwrap();
        assert_eq!(ctx.pointer_mode(), PointerMode::Locked);
        lock.toggle(&mut be, &(), &ctx, PointerMode::Locked, LockLifetime::Oneshot)
            .unwrap();
        assert_eq!(ctx.pointer_mode(), PointerMode::Free);
        assert!(be.live.is_empty());
    }

    #[test]
    fn cursor_overrides() {
        let mut cfg = DriverConfig::default();
        cfg.keep_cursor_visible = true;
        cfg.hide_cursor = true;
        let ctx = ctx_with(cfg);
        let mut be = Backend::default();
        let mut lock = PointerLock::new();

        lock.engage(&mut be, &(), &ctx, PointerMode::Confined, LockLifetime::Persistent)
            .unwrap();
        lock.release(&mut be, &ctx);
        assert!(!be.calls.iter().any(|c| c == "hide" || c == "restore"));
    }

    #[test]
    fn failed_relative_cleans_up_constraint() {
        let ctx = ctx_with(DriverConfig::default());
        let mut be = Backend::default();
        be.fail_relative = true;
        let mut lock = PointerLock::new();

        assert!(lock
            .engage(&mut be, &(), &ctx, PointerMode::Locked, LockLifetime::Oneshot)
            .is_err());
        assert!(!lock.is_active());
        assert!(be.live.is_empty());
        assert_eq!(ctx.pointer_mode(), PointerMode::Free);
    }
}
