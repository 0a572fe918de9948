// Synthesized hardware input records
//
// These are handed to the host's privileged injection channel,
// which queues them exactly as if real hardware produced them.
//
// Austin Shafer - 2020
use crate::context::Hwnd;

bitflags! {
    /// Mouse event flags, same bit values as the target
    pub struct MouseFlags: u32 {
        const MOVE = 0x0001;
        const LEFTDOWN = 0x0002;
        const LEFTUP = 0x0004;
        const RIGHTDOWN = 0x0008;
        const RIGHTUP = 0x0010;
        const MIDDLEDOWN = 0x0020;
        const MIDDLEUP = 0x0040;
        const WHEEL = 0x0800;
        const ABSOLUTE = 0x8000;
    }
}

bitflags! {
    pub struct KeyFlags: u32 {
        const EXTENDEDKEY = 0x0001;
        const KEYUP = 0x0002;
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseInput {
    /// absolute position, or a delta when ABSOLUTE is not set
    pub mi_dx: i32,
    pub mi_dy: i32,
    /// wheel movement for WHEEL events
    pub mi_data: i32,
    pub mi_flags: MouseFlags,
    pub mi_time: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyboardInput {
    pub ki_vkey: u16,
    pub ki_scan: u16,
    pub ki_flags: KeyFlags,
    pub ki_time: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum HardwareInput {
    Mouse(MouseInput),
    Keyboard(KeyboardInput),
}

/// The host side of input delivery
pub trait InputInjector: Send + Sync {
    /// Queue `input` for `hwnd` as if it came from real hardware.
    /// Delivery is ordered and never fails.
    fn send_hardware_input(&self, hwnd: Hwnd, input: &HardwareInput);

    /// The window the host currently considers foreground
    fn foreground_window(&self) -> Hwnd;
}
