//! # Keycode translation
//!
//! There are three numbering spaces for "which key":
//! * the compositor's hardware scancodes (linux evdev codes)
//! * the target platform's virtual keys, the semantic identity
//! * the target platform's own hardware scancodes, with the
//!   extended key flag at bit 8
//!
//! Translation between them is table driven. Every lookup returns
//! 0 (or None) for unmapped input and never fails.
//!
//! The layout dependent queries (unicode translation, key names,
//! layout ids) live in `layout`.

// Austin Shafer - 2020
pub mod layout;
pub mod vkeys;
#[cfg(test)]
mod tests;

use vkeys::*;

/// The highest evdev code the compositor can deliver
pub const KEY_MAX: u32 = 0x2ff;

/// Code translation table
///
/// This provides a generic way of defining a table of (key, foreign key) pairs
/// that we can translate between, in either direction.
pub(crate) struct CodeTranslator<K: PartialEq + Copy, T: PartialEq + Copy> {
    ct_table: Vec<(K, T)>,
}

impl<K: PartialEq + Copy, T: PartialEq + Copy> CodeTranslator<K, T> {
    /// Find the first key paired with `val`
    pub(crate) fn val_to_key(&self, val: T) -> Option<K> {
        for entry in self.ct_table.iter() {
            match entry.1 == val {
                true => return Some(entry.0),
                false => continue,
            }
        }

        return None;
    }

    /// Find the value paired with `code`
    pub(crate) fn key_to_val(&self, code: K) -> Option<T> {
        for entry in self.ct_table.iter() {
            match entry.0 == code {
                true => return Some(entry.1),
                false => continue,
            }
        }

        return None;
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.ct_table.iter().map(|e| e.0)
    }
}

lazy_static::lazy_static! {
    /// evdev code -> virtual key
    pub(crate) static ref CT_EVDEV_TO_VK: CodeTranslator<u32, u16> =
        CodeTranslator {
            ct_table: vec![
                (1,   VK_ESCAPE),
                (2,   vk_char(b'1')),
                (3,   vk_char(b'2')),
                (4,   vk_char(b'3')),
                (5,   vk_char(b'4')),
                (6,   vk_char(b'5')),
                (7,   vk_char(b'6')),
                (8,   vk_char(b'7')),
                (9,   vk_char(b'8')),
                (10,  vk_char(b'9')),
                (11,  vk_char(b'0')),
                (12,  VK_OEM_MINUS),
                (13,  VK_OEM_PLUS),
                (14,  VK_BACK),
                (15,  VK_TAB),
                (16,  vk_char(b'Q')),
                (17,  vk_char(b'W')),
                (18,  vk_char(b'E')),
                (19,  vk_char(b'R')),
                (20,  vk_char(b'T')),
                (21,  vk_char(b'Y')),
                (22,  vk_char(b'U')),
                (23,  vk_char(b'I')),
                (24,  vk_char(b'O')),
                (25,  vk_char(b'P')),
                (26,  VK_OEM_4),
                (27,  VK_OEM_6),
                (28,  VK_RETURN),
                (29,  VK_LCONTROL),
                (30,  vk_char(b'A')),
                (31,  vk_char(b'S')),
                (32,  vk_char(b'D')),
                (33,  vk_char(b'F')),
                (34,  vk_char(b'G')),
                (35,  vk_char(b'H')),
                (36,  vk_char(b'J')),
                (37,  vk_char(b'K')),
                (38,  vk_char(b'L')),
                (39,  VK_OEM_1),
                (40,  VK_OEM_7),
                (41,  VK_OEM_3),
                (42,  VK_LSHIFT),
                (43,  VK_OEM_5),
                (44,  vk_char(b'Z')),
                (45,  vk_char(b'X')),
                (46,  vk_char(b'C')),
                (47,  vk_char(b'V')),
                (48,  vk_char(b'B')),
                (49,  vk_char(b'N')),
                (50,  vk_char(b'M')),
                (51,  VK_OEM_COMMA),
                (52,  VK_OEM_PERIOD),
                (53,  VK_OEM_2),
                (54,  VK_RSHIFT),
                (55,  VK_MULTIPLY),
                (56,  VK_LMENU),
                (57,  VK_SPACE),
                (58,  VK_CAPITAL),
                (59,  VK_F1),
                (60,  VK_F2),
                (61,  VK_F3),
                (62,  VK_F4),
                (63,  VK_F5),
                (64,  VK_F6),
                (65,  VK_F7),
                (66,  VK_F8),
                (67,  VK_F9),
                (68,  VK_F10),
                (69,  VK_NUMLOCK),
                (70,  VK_SCROLL),
                (71,  VK_NUMPAD7),
                (72,  VK_NUMPAD8),
                (73,  VK_NUMPAD9),
                (74,  VK_SUBTRACT),
                (75,  VK_NUMPAD4),
                (76,  VK_NUMPAD5),
                (77,  VK_NUMPAD6),
                (78,  VK_ADD),
                (79,  VK_NUMPAD1),
                (80,  VK_NUMPAD2),
                (81,  VK_NUMPAD3),
                (82,  VK_NUMPAD0),
                (83,  VK_DECIMAL),
                (86,  VK_OEM_102),
                (87,  VK_F11),
                (88,  VK_F12),
                (93,  VK_KANA),         // KATAKANAHIRAGANA
                (96,  VK_RETURN),       // KPENTER
                (97,  VK_RCONTROL),
                (98,  VK_DIVIDE),       // KPSLASH
                (99,  VK_SNAPSHOT),     // SYSRQ
                (100, VK_RMENU),
                (102, VK_HOME),
                (103, VK_UP),
                (104, VK_PRIOR),
                (105, VK_LEFT),
                (106, VK_RIGHT),
                (107, VK_END),
                (108, VK_DOWN),
                (109, VK_NEXT),
                (110, VK_INSERT),
                (111, VK_DELETE),
                (113, VK_VOLUME_MUTE),
                (114, VK_VOLUME_DOWN),
                (115, VK_VOLUME_UP),
                (117, VK_OEM_NEC_EQUAL), // KPEQUAL
                (119, VK_PAUSE),
                (121, VK_SEPARATOR),    // KPCOMMA
                (125, VK_LWIN),
                (126, VK_RWIN),
                (127, VK_APPS),         // COMPOSE
                (138, VK_HELP),
                (163, VK_MEDIA_NEXT_TRACK),
                (164, VK_MEDIA_PLAY_PAUSE),
                (165, VK_MEDIA_PREV_TRACK),
                (166, VK_MEDIA_STOP),
                (183, VK_F13),
                (184, VK_F14),
                (185, VK_F15),
                (186, VK_F16),
                (187, VK_F17),
                (188, VK_F18),
                (189, VK_F19),
                (190, VK_F20),
                (191, VK_F21),
                (192, VK_F22),
                (193, VK_F23),
                (194, VK_F24),
            ],
        };

    /// virtual key -> target scancode
    ///
    /// The generic SHIFT/CONTROL/MENU keys are deliberately absent so
    /// that every scancode has exactly one sided key behind it.
    pub(crate) static ref CT_VK_TO_SCAN: CodeTranslator<u16, u16> =
        CodeTranslator {
            ct_table: vec![
                (VK_BACK,             0x0e),
                (VK_TAB,              0x0f),
                (VK_RETURN,           0x1c),
                (VK_PAUSE,            0x45),
                (VK_CAPITAL,          0x3a),
                (VK_KANA,             0x70),
                (VK_ESCAPE,           0x01),
                (VK_SPACE,            0x39),
                (VK_PRIOR,            0x149),
                (VK_NEXT,             0x151),
                (VK_END,              0x14f),
                (VK_HOME,             0x147),
                (VK_LEFT,             0x14b),
                (VK_UP,               0x148),
                (VK_RIGHT,            0x14d),
                (VK_DOWN,             0x150),
                (VK_SNAPSHOT,         0x137),
                (VK_INSERT,           0x152),
                (VK_DELETE,           0x153),
                (vk_char(b'0'),       0x0b),
                (vk_char(b'1'),       0x02),
                (vk_char(b'2'),       0x03),
                (vk_char(b'3'),       0x04),
                (vk_char(b'4'),       0x05),
                (vk_char(b'5'),       0x06),
                (vk_char(b'6'),       0x07),
                (vk_char(b'7'),       0x08),
                (vk_char(b'8'),       0x09),
                (vk_char(b'9'),       0x0a),
                (vk_char(b'A'),       0x1e),
                (vk_char(b'B'),       0x30),
                (vk_char(b'C'),       0x2e),
                (vk_char(b'D'),       0x20),
                (vk_char(b'E'),       0x12),
                (vk_char(b'F'),       0x21),
                (vk_char(b'G'),       0x22),
                (vk_char(b'H'),       0x23),
                (vk_char(b'I'),       0x17),
                (vk_char(b'J'),       0x24),
                (vk_char(b'K'),       0x25),
                (vk_char(b'L'),       0x26),
                (vk_char(b'M'),       0x32),
                (vk_char(b'N'),       0x31),
                (vk_char(b'O'),       0x18),
                (vk_char(b'P'),       0x19),
                (vk_char(b'Q'),       0x10),
                (vk_char(b'R'),       0x13),
                (vk_char(b'S'),       0x1f),
                (vk_char(b'T'),       0x14),
                (vk_char(b'U'),       0x16),
                (vk_char(b'V'),       0x2f),
                (vk_char(b'W'),       0x11),
                (vk_char(b'X'),       0x2d),
                (vk_char(b'Y'),       0x15),
                (vk_char(b'Z'),       0x2c),
                (VK_LWIN,             0x15b),
                (VK_RWIN,             0x15c),
                (VK_APPS,             0x15d),
                (VK_NUMPAD0,          0x52),
                (VK_NUMPAD1,          0x4f),
                (VK_NUMPAD2,          0x50),
                (VK_NUMPAD3,          0x51),
                (VK_NUMPAD4,          0x4b),
                (VK_NUMPAD5,          0x4c),
                (VK_NUMPAD6,          0x4d),
                (VK_NUMPAD7,          0x47),
                (VK_NUMPAD8,          0x48),
                (VK_NUMPAD9,          0x49),
                (VK_MULTIPLY,         0x37),
                (VK_ADD,              0x4e),
                (VK_SEPARATOR,        0x7e),
                (VK_SUBTRACT,         0x4a),
                (VK_DECIMAL,          0x53),
                (VK_DIVIDE,           0x135),
                (VK_F1,               0x3b),
                (VK_F2,               0x3c),
                (VK_F3,               0x3d),
                (VK_F4,               0x3e),
                (VK_F5,               0x3f),
                (VK_F6,               0x40),
                (VK_F7,               0x41),
                (VK_F8,               0x42),
                (VK_F9,               0x43),
                (VK_F10,              0x44),
                (VK_F11,              0x57),
                (VK_F12,              0x58),
                (VK_F13,              0x64),
                (VK_F14,              0x65),
                (VK_F15,              0x66),
                (VK_F16,              0x67),
                (VK_F17,              0x68),
                (VK_F18,              0x69),
                (VK_F19,              0x6a),
                (VK_F20,              0x6b),
                (VK_F21,              0x6c),
                (VK_F22,              0x6d),
                (VK_F23,              0x6e),
                (VK_F24,              0x76),
                (VK_NUMLOCK,          0x145),
                (VK_SCROLL,           0x46),
                (VK_OEM_NEC_EQUAL,    0x10d),
                (VK_LSHIFT,           0x2a),
                (VK_RSHIFT,           0x36),
                (VK_LCONTROL,         0x1d),
                (VK_RCONTROL,         0x11d),
                (VK_LMENU,            0x38),
                (VK_RMENU,            0x138),
                (VK_VOLUME_MUTE,      0x120),
                (VK_VOLUME_DOWN,      0x12e),
                (VK_VOLUME_UP,        0x130),
                (VK_MEDIA_NEXT_TRACK, 0x119),
                (VK_MEDIA_PREV_TRACK, 0x110),
                (VK_MEDIA_STOP,       0x124),
                (VK_MEDIA_PLAY_PAUSE, 0x122),
                (VK_OEM_1,            0x27),
                (VK_OEM_PLUS,         0x0d),
                (VK_OEM_COMMA,        0x33),
                (VK_OEM_MINUS,        0x0c),
                (VK_OEM_PERIOD,       0x34),
                (VK_OEM_2,            0x35),
                (VK_OEM_3,            0x29),
                (VK_OEM_4,            0x1a),
                (VK_OEM_5,            0x2b),
                (VK_OEM_6,            0x1b),
                (VK_OEM_7,            0x28),
                (VK_OEM_102,          0x56),
                (VK_OEM_RESET,        0x71),
                (VK_OEM_CLEAR,        0x59),
            ],
        };

    /// virtual key (with EXTENDED for the extended variant) -> display name
    pub(crate) static ref CT_VK_NAMES: CodeTranslator<u16, &'static str> =
        CodeTranslator {
            ct_table: vec![
                (VK_ADD,                        "Num +"),
                (VK_BACK,                       "Backspace"),
                (VK_CAPITAL,                    "Caps Lock"),
                (VK_CONTROL,                    "Ctrl"),
                (VK_DECIMAL,                    "Num Del"),
                (VK_DELETE | EXTENDED,          "Delete"),
                (VK_DIVIDE | EXTENDED,          "Num /"),
                (VK_DOWN | EXTENDED,            "Down"),
                (VK_END | EXTENDED,             "End"),
                (VK_ESCAPE,                     "Esc"),
                (VK_F1,                         "F1"),
                (VK_F2,                         "F2"),
                (VK_F3,                         "F3"),
                (VK_F4,                         "F4"),
                (VK_F5,                         "F5"),
                (VK_F6,                         "F6"),
                (VK_F7,                         "F7"),
                (VK_F8,                         "F8"),
                (VK_F9,                         "F9"),
                (VK_F10,                        "F10"),
                (VK_F11,                        "F11"),
                (VK_F12,                        "F12"),
                (VK_F13,                        "F13"),
                (VK_F14,                        "F14"),
                (VK_F15,                        "F15"),
                (VK_F16,                        "F16"),
                (VK_F17,                        "F17"),
                (VK_F18,                        "F18"),
                (VK_F19,                        "F19"),
                (VK_F20,                        "F20"),
                (VK_F21,                        "F21"),
                (VK_F22,                        "F22"),
                (VK_F23,                        "F23"),
                (VK_F24,                        "F24"),
                (VK_HELP | EXTENDED,            "Help"),
                (VK_HOME | EXTENDED,            "Home"),
                (VK_INSERT | EXTENDED,          "Insert"),
                (VK_LCONTROL,                   "Ctrl"),
                (VK_LEFT | EXTENDED,            "Left"),
                (VK_LMENU,                      "Alt"),
                (VK_LSHIFT,                     "Left Shift"),
                (VK_LWIN | EXTENDED,            "Win"),
                (VK_MENU,                       "Alt"),
                (VK_MULTIPLY,                   "Num *"),
                (VK_NEXT | EXTENDED,            "Page Down"),
                (VK_NUMLOCK | EXTENDED,         "Num Lock"),
                (VK_NUMPAD0,                    "Num 0"),
                (VK_NUMPAD1,                    "Num 1"),
                (VK_NUMPAD2,                    "Num 2"),
                (VK_NUMPAD3,                    "Num 3"),
                (VK_NUMPAD4,                    "Num 4"),
                (VK_NUMPAD5,                    "Num 5"),
                (VK_NUMPAD6,                    "Num 6"),
                (VK_NUMPAD7,                    "Num 7"),
                (VK_NUMPAD8,                    "Num 8"),
                (VK_NUMPAD9,                    "Num 9"),
                (VK_OEM_CLEAR,                  "Num Clear"),
                (VK_OEM_NEC_EQUAL | EXTENDED,   "Num ="),
                (VK_PRIOR | EXTENDED,           "Page Up"),
                (VK_RCONTROL | EXTENDED,        "Right Ctrl"),
                (VK_RETURN,                     "Return"),
                (VK_RETURN | EXTENDED,          "Num Enter"),
                (VK_RIGHT | EXTENDED,           "Right"),
                (VK_RMENU | EXTENDED,           "Right Alt"),
                (VK_RSHIFT,                     "Right Shift"),
                (VK_RWIN | EXTENDED,            "Right Win"),
                (VK_SEPARATOR,                  "Num ,"),
                (VK_SHIFT,                      "Shift"),
                (VK_SPACE,                      "Space"),
                (VK_SUBTRACT,                   "Num -"),
                (VK_TAB,                        "Tab"),
                (VK_UP | EXTENDED,              "Up"),
                (VK_VOLUME_DOWN | EXTENDED,     "Volume Down"),
                (VK_VOLUME_MUTE | EXTENDED,     "Mute"),
                (VK_VOLUME_UP | EXTENDED,       "Volume Up"),
                (VK_OEM_MINUS,                  "-"),
                (VK_OEM_PLUS,                   "="),
                (VK_OEM_1,                      ";"),
                (VK_OEM_2,                      "/"),
                (VK_OEM_3,                      "`"),
                (VK_OEM_4,                      "["),
                (VK_OEM_5,                      "\\"),
                (VK_OEM_6,                      "]"),
                (VK_OEM_7,                      "'"),
                (VK_OEM_COMMA,                  ","),
                (VK_OEM_PERIOD,                 "."),
            ],
        };
}

/// evdev code to virtual key. 0 means "no key".
pub fn scancode_to_virtual_key(code: u32) -> u16 {
    if code == 0 || code > KEY_MAX {
        return 0;
    }

    CT_EVDEV_TO_VK.key_to_val(code).unwrap_or(0)
}

/// Virtual key to target scancode. 0 means unmapped.
pub fn virtual_key_to_target_scancode(vkey: u16) -> u16 {
    CT_VK_TO_SCAN.key_to_val(vkey).unwrap_or(0)
}

/// Target scancode back to the virtual key, by a linear scan of the
/// forward table. 0 means unmapped.
pub fn target_scancode_to_virtual_key(scan: u16) -> u16 {
    if scan == 0 {
        return 0;
    }

    CT_VK_TO_SCAN.val_to_key(scan).unwrap_or(0)
}

/// The display name of a virtual key. Pass `vkey | EXTENDED` to get
/// the extended variant's name.
pub fn virtual_key_to_display_name(vkey: u16) -> Option<&'static str> {
    CT_VK_NAMES.key_to_val(vkey)
}

/// Collapse a sided modifier to its generic key
pub fn fold_sided_modifier(vkey: u16) -> u16 {
    match vkey {
        VK_LSHIFT | VK_RSHIFT => VK_SHIFT,
        VK_LCONTROL | VK_RCONTROL => VK_CONTROL,
        VK_LMENU | VK_RMENU => VK_MENU,
        v => v,
    }
}

/// True if the target scancode carries the extended key bit
pub fn is_extended(scan: u16) -> bool {
    scan & EXTENDED != 0
}
