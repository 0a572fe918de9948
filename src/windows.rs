// Window notifications and cursor queries from the host
//
// The host tells us when its windows move, show, hide and die.
// We only use these to track which window input should go to,
// the windows themselves are drawn by the host.
//
// Austin Shafer - 2020
use crate::context::{Hwnd, LockLifetime, PointerMode, NO_WINDOW};
use crate::driver::{Backend, Driver, Host};
use utils::log;
use utils::region::Rect;

/// SWP flag: the window is being shown
pub const SWP_SHOWWINDOW: u32 = 0x0040;
/// SWP flag: the window is being hidden
pub const SWP_HIDEWINDOW: u32 = 0x0080;
/// ShowWindow command that hides the window
pub const SW_HIDE: i32 = 0;

/// What the host knows about one of its windows
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    /// The window's parent is the desktop
    pub toplevel: bool,
    /// The window currently has the visible style
    pub visible: bool,
    pub class: String,
}

/// Window queries and requests answered by the host
pub trait HostWindows {
    fn window_info(&self, hwnd: Hwnd) -> WindowInfo;
    /// Activate, raise and focus `hwnd`, sizing it to `extent`
    fn activate_window(&self, hwnd: Hwnd, extent: (u32, u32));
    fn set_focus(&self, hwnd: Hwnd);
    /// The bounding rect of all monitors
    fn virtual_screen_rect(&self) -> Rect<i32>;
}

impl<B: Backend, H: Host> Driver<B, H> {
    /// A window is about to move, resize, show or hide
    ///
    /// Shown top level windows become the focus window. The first one
    /// also brings up the compositor connection on this thread.
    pub fn window_pos_changing(&self, hwnd: Hwnd, swp_flags: u32) {
        let ctx = &self.d_ctx;
        if ctx.dc_config.gpu_only || hwnd == NO_WINDOW {
            return;
        }

        let info = self.d_host.window_info(hwnd);
        if !info.toplevel || ctx.dc_config.is_denied_class(&info.class) {
            return;
        }
        if swp_flags & SWP_SHOWWINDOW == 0 && !info.visible {
            return;
        }
        if swp_flags & SWP_HIDEWINDOW != 0 {
            return;
        }

        {
            let mut st = self.state();
            if let Err(e) = self.connect_once(&mut st) {
                log::error!("Could not connect to the compositor: {}", e);
            }
        }

        let focus = ctx.focus_window();
        if focus != hwnd {
            if focus != NO_WINDOW && ctx.last_focus_window() != focus {
                ctx.set_last_focus_window(focus);
            }
            ctx.set_focus_window(hwnd);
        }
    }

    /// A window is being shown or hidden. Returns `swp` unchanged.
    pub fn show_window(&self, hwnd: Hwnd, cmd: i32, swp: u32) -> u32 {
        let ctx = &self.d_ctx;
        if ctx.gpu_active() {
            return swp;
        }

        if cmd == SW_HIDE && ctx.focus_window() == hwnd {
            let last = ctx.last_focus_window();
            log::debug!("Focus window {:#x} hidden, focusing {:#x}", hwnd, last);

            ctx.set_focus_window(last);
            if last != NO_WINDOW {
                self.d_host.set_focus(last);
            }
        }

        return swp;
    }

    pub fn destroy_window(&self, hwnd: Hwnd) {
        let ctx = &self.d_ctx;

        if ctx.gpu_active() {
            if ctx.gpu_window() == hwnd {
                ctx.set_gpu_window(NO_WINDOW);
            }
            return;
        }

        if ctx.focus_window() == hwnd {
            let fg = self.d_host.foreground_window();
            ctx.set_focus_window(fg);
            if ctx.last_focus_window() == hwnd {
                ctx.set_last_focus_window(NO_WINDOW);
            }
            if fg != NO_WINDOW {
                self.d_host.set_focus(fg);
            }
        }
    }

    /// The pointer position in screen coordinates
    ///
    /// None while a lock session holds the pointer, the caller keeps
    /// whatever position it had.
    pub fn get_cursor_pos(&self) -> Option<(i32, i32)> {
        let ptr = self.d_ctx.pointer();
        if ptr.ps_mode != PointerMode::Free {
            return None;
        }

        match ptr.ps_has_position {
            true => Some((ptr.ps_last_x, ptr.ps_last_y)),
            false => Some((0, 0)),
        }
    }

    /// Restrict the pointer to `clip`, or release it with None
    ///
    /// Any clip smaller than the virtual screen locks the pointer,
    /// since a presentation surface can only hold it entirely.
    pub fn clip_cursor(&self, clip: Option<Rect<i32>>) -> bool {
        let ctx = &self.d_ctx;
        if !ctx.gpu_active() {
            return true;
        }

        let screen = self.d_host.virtual_screen_rect();
        let mut st = self.state();
        let st = &mut *st;
        let backend = match st.ds_backend.as_mut() {
            Some(b) => b,
            None => return true,
        };

        match clip {
            Some(rect) if rect.shrinks(&screen) => {
                let surface = match st.ds_surface.as_ref() {
                    Some(s) => s,
                    None => return true,
                };
                if let Err(e) = st.ds_lock.engage(
                    backend,
                    surface.base(),
                    ctx,
                    PointerMode::Locked,
                    LockLifetime::Persistent,
                ) {
                    log::error!("Could not lock the pointer: {}", e);
                }
            }
            _ => {
                st.ds_lock.release(backend, ctx);
            }
        }

        return true;
    }
}
