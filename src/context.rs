// The shared driver state
//
// Everything that is process wide (pointer position, the tracked
// windows, the timestamp offset) lives in one DriverContext that is
// created when the driver loads and handed to every component.
//
// The window slots are atomics since they are read from render
// threads while the dispatch thread writes them.
//
// Austin Shafer - 2020
use crate::config::DriverConfig;
use crate::timestamp::{Clock, TickClock, TimestampReconciler};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

/// An opaque target window handle. 0 is no window.
pub type Hwnd = u64;
pub const NO_WINDOW: Hwnd = 0;

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mtx: &Mutex<T>) -> MutexGuard<'_, T> {
    mtx.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerMode {
    Free,
    /// Pointer is held in a region but still reports absolute positions
    Confined,
    /// Pointer is hidden and only reports relative motion
    Locked,
}

/// How long a constraint lives on the compositor side
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockLifetime {
    /// Deactivated for good once the compositor breaks it
    Oneshot,
    /// Reactivates when the pointer comes back
    Persistent,
}

#[derive(Debug, Copy, Clone)]
pub struct PointerState {
    pub ps_last_x: i32,
    pub ps_last_y: i32,
    pub ps_mode: PointerMode,
    /// serial of the last pointer enter, needed to set the cursor image
    pub ps_serial: u32,
    /// false until the first motion event arrives
    pub ps_has_position: bool,
}

impl PointerState {
    fn new() -> Self {
        Self {
            ps_last_x: 0,
            ps_last_y: 0,
            ps_mode: PointerMode::Free,
            ps_serial: 0,
            ps_has_position: false,
        }
    }
}

/// Actions requested from the keyboard
///
/// These change the lock state, which needs the global lock, so they
/// are queued during dispatch and applied afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Hotkey {
    Fullscreen,
    ToggleConfine,
    ToggleLock,
}

pub struct DriverContext {
    pub dc_config: DriverConfig,
    dc_pointer: Mutex<PointerState>,
    dc_gpu_window: AtomicU64,
    dc_focus_window: AtomicU64,
    dc_last_focus: AtomicU64,
    dc_gpu_active: AtomicBool,
    dc_reconciler: Mutex<TimestampReconciler>,
    dc_dispatch_thread: Mutex<Option<ThreadId>>,
    dc_hotkeys: Mutex<Vec<Hotkey>>,
}

impl DriverContext {
    pub fn new(config: DriverConfig) -> Self {
        Self::with_clock(config, Box::new(TickClock))
    }

    pub fn with_clock(config: DriverConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            dc_config: config,
            dc_pointer: Mutex::new(PointerState::new()),
            dc_gpu_window: AtomicU64::new(NO_WINDOW),
            dc_focus_window: AtomicU64::new(NO_WINDOW),
            dc_last_focus: AtomicU64::new(NO_WINDOW),
            dc_gpu_active: AtomicBool::new(false),
            dc_reconciler: Mutex::new(TimestampReconciler::new(clock)),
            dc_dispatch_thread: Mutex::new(None),
            dc_hotkeys: Mutex::new(Vec::new()),
        }
    }

    pub fn pointer(&self) -> MutexGuard<'_, PointerState> {
        lock(&self.dc_pointer)
    }

    pub fn pointer_mode(&self) -> PointerMode {
        self.pointer().ps_mode
    }

    pub fn set_pointer_mode(&self, mode: PointerMode) {
        self.pointer().ps_mode = mode;
    }

    pub fn gpu_window(&self) -> Hwnd {
        self.dc_gpu_window.load(Ordering::Acquire)
    }

    pub fn set_gpu_window(&self, hwnd: Hwnd) {
        self.dc_gpu_window.store(hwnd, Ordering::Release);
    }

    pub fn focus_window(&self) -> Hwnd {
        self.dc_focus_window.load(Ordering::Acquire)
    }

    pub fn set_focus_window(&self, hwnd: Hwnd) {
        self.dc_focus_window.store(hwnd, Ordering::Release);
    }

    pub fn last_focus_window(&self) -> Hwnd {
        self.dc_last_focus.load(Ordering::Acquire)
    }

    pub fn set_last_focus_window(&self, hwnd: Hwnd) {
        self.dc_last_focus.store(hwnd, Ordering::Release);
    }

    pub fn gpu_active(&self) -> bool {
        self.dc_gpu_active.load(Ordering::Acquire)
    }

    pub fn set_gpu_active(&self, active: bool) {
        self.dc_gpu_active.store(active, Ordering::Release);
    }

    /// Convert a compositor event time to a target tick count
    pub fn reconcile_time(&self, time: u32) -> u32 {
        lock(&self.dc_reconciler).reconcile(time)
    }

    /// Make the calling thread the owner of the compositor connection
    pub fn claim_dispatch_thread(&self) {
        *lock(&self.dc_dispatch_thread) = Some(thread::current().id());
    }

    pub fn is_dispatch_thread(&self) -> bool {
        *lock(&self.dc_dispatch_thread) == Some(thread::current().id())
    }

    pub fn queue_hotkey(&self, key: Hotkey) {
        lock(&self.dc_hotkeys).push(key);
    }

    /// Take all hotkeys queued since the last call, oldest first
    pub fn take_hotkeys(&self) -> Vec<Hotkey> {
        std::mem::take(&mut *lock(&self.dc_hotkeys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_slots_start_empty() {
        let ctx = DriverContext::new(DriverConfig::default());
        assert_eq!(ctx.gpu_window(), NO_WINDOW);
        assert_eq!(ctx.focus_window(), NO_WINDOW);
        assert_eq!(ctx.last_focus_window(), NO_WINDOW);
        assert!(!ctx.gpu_active());
        assert_eq!(ctx.pointer_mode(), PointerMode::Free);
    }

    #[test]
    fn dispatch_thread_is_per_thread() {
        let ctx = std::sync::Arc::new(DriverContext::new(DriverConfig::default()));
        assert!(!ctx.is_dispatch_thread());
        ctx.claim_dispatch_thread();
        assert!(ctx.is_dispatch_thread());

        let other = ctx.clone();
        let seen = std::thread::spawn(move || other.is_dispatch_thread())
            .join()
            .unwrap();
        assert!(!seen);
    }

    #[test]
    fn hotkeys_drain_in_order() {
        let ctx = DriverContext::new(DriverConfig::default());
        ctx.queue_hotkey(Hotkey::ToggleLock);
        ctx.queue_hotkey(Hotkey::Fullscreen);
        assert_eq!(ctx.take_hotkeys(), vec![Hotkey::ToggleLock, Hotkey::Fullscreen]);
        assert!(ctx.take_hotkeys().is_empty());
    }
}
