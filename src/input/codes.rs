// Compositor input constants
//
// Austin Shafer - 2020

// linux button codes, see linux/input-event-codes.h
pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;
pub const BTN_MIDDLE: u32 = 0x112;

/// One notch of the target's scroll wheel
pub const WHEEL_DELTA: i32 = 120;

// linux key codes for the keys we treat as hotkeys
pub const KEY_F9: u32 = 67;
pub const KEY_F10: u32 = 68;
pub const KEY_F11: u32 = 87;
