//! # waylanddrv
//!
//! A display driver core that lets applications written for a
//! win32-style windowing API run against a wayland compositor.
//!
//! The host runtime owns its windows and draws them itself. This
//! crate fills in the pieces the host cannot do alone:
//!
//! * `input` - turns compositor pointer and keyboard callbacks into
//!   hardware input records and hands them to the host.
//! * `keycodes` - scancode and virtual key tables, and the layout
//!   queries built on them.
//! * `pointer_lock` - confining and locking the pointer to the
//!   presentation surface.
//! * `surface` - the single compositor surface a GPU swapchain
//!   presents into.
//! * `vulkan` - the WSI bridge that hands out win32 surfaces backed
//!   by wayland ones.
//! * `msgwait` - servicing the compositor connection from the host's
//!   wait calls.
//!
//! Everything is reached through a `Driver`, which is generic over
//! the compositor backend and the host so both can be swapped out.
//! `wayland::wayland_driver` builds the production driver.
//!
//! ```ignore
//! let driver = waylanddrv::wayland::wayland_driver(host);
//!
//! driver.window_pos_changing(hwnd, SWP_SHOWWINDOW);
//! let surface = unsafe { driver.create_win32_surface(instance, hwnd, None)? };
//! ```

// Austin Shafer - 2020
#[macro_use]
extern crate bitflags;
extern crate lazy_static;
extern crate utils;

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod input;
pub mod keycodes;
pub mod msgwait;
pub mod pointer_lock;
pub mod surface;
pub mod timestamp;
pub mod vulkan;
pub mod wayland;
pub mod windows;

pub use config::DriverConfig;
pub use context::{DriverContext, Hotkey, Hwnd, LockLifetime, PointerMode, NO_WINDOW};
pub use driver::{Backend, Connector, Driver, Host, VulkanLoader};
pub use error::DriverError;
pub use input::hardware::{HardwareInput, InputInjector, KeyFlags, MouseFlags};
pub use input::InputRouter;
pub use msgwait::{DisplayPump, HostWait, WAIT_OBJECT_0, WAIT_TIMEOUT};
pub use pointer_lock::LockBackend;
pub use surface::SurfaceBackend;
pub use vulkan::{NativeVulkan, ProcAddr};
pub use windows::{HostWindows, WindowInfo};
