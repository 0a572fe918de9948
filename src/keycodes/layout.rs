// Layout dependent keyboard queries
//
// Only a single hardcoded US layout is supported. The layout ids
// handed back to the host are fabricated from the locale id.
//
// Austin Shafer - 2020
use super::vkeys::*;
use super::{
    fold_sided_modifier, target_scancode_to_virtual_key, virtual_key_to_display_name,
    virtual_key_to_target_scancode,
};

/// MapVirtualKey translation types
pub const MAPVK_VK_TO_VSC: u32 = 0;
pub const MAPVK_VSC_TO_VK: u32 = 1;
pub const MAPVK_VK_TO_CHAR: u32 = 2;
pub const MAPVK_VSC_TO_VK_EX: u32 = 3;
pub const MAPVK_VK_TO_VSC_EX: u32 = 4;

/// The only layout we ever report
pub const US_LAYOUT: u32 = 0x0409;

/// Bit 25 of a key message lparam: the caller does not care about
/// left vs right modifiers
const KEYNAME_DONT_CARE: u32 = 1 << 25;

/// Bit 15 of a ToUnicode scancode marks a key release
const SCAN_KEYUP: u16 = 0x8000;

// character -> (modifiers << 8) | vkey
// shift is 0x100, ctrl is 0x200
static CHAR_VKEY_MAP: [u16; 128] = [
    0x332, 0x241, 0x242, 0x003, 0x244, 0x245, 0x246, 0x247,
    0x008, 0x009, 0x20d, 0x24b, 0x24c, 0x00d, 0x24e, 0x24f,
    0x250, 0x251, 0x252, 0x253, 0x254, 0x255, 0x256, 0x257,
    0x258, 0x259, 0x25a, 0x01b, 0x2dc, 0x2dd, 0x336, 0x3bd,
    0x020, 0x131, 0x1de, 0x133, 0x134, 0x135, 0x137, 0x0de,
    0x139, 0x130, 0x138, 0x1bb, 0x0bc, 0x0bd, 0x0be, 0x0bf,
    0x030, 0x031, 0x032, 0x033, 0x034, 0x035, 0x036, 0x037,
    0x038, 0x039, 0x1ba, 0x0ba, 0x1bc, 0x0bb, 0x1be, 0x1bf,
    0x132, 0x141, 0x142, 0x143, 0x144, 0x145, 0x146, 0x147,
    0x148, 0x149, 0x14a, 0x14b, 0x14c, 0x14d, 0x14e, 0x14f,
    0x150, 0x151, 0x152, 0x153, 0x154, 0x155, 0x156, 0x157,
    0x158, 0x159, 0x15a, 0x0db, 0x0dc, 0x0dd, 0x136, 0x1bd,
    0x0c0, 0x041, 0x042, 0x043, 0x044, 0x045, 0x046, 0x047,
    0x048, 0x049, 0x04a, 0x04b, 0x04c, 0x04d, 0x04e, 0x04f,
    0x050, 0x051, 0x052, 0x053, 0x054, 0x055, 0x056, 0x057,
    0x058, 0x059, 0x05a, 0x1db, 0x1dc, 0x1dd, 0x1c0, 0x208,
];

pub fn get_keyboard_layout() -> u32 {
    US_LAYOUT
}

/// Build the layout id for a locale.
///
/// Chinese, Japanese and Korean use the IME device id in the high word.
pub fn fabricate_layout_id(lcid: u16) -> u32 {
    let lcid = lcid as u32;

    match lcid & 0x3ff {
        0x04 | 0x11 | 0x12 => lcid | 0xe001 << 16,
        _ => lcid | lcid << 16,
    }
}

/// `name` is the hex layout name ("00000409"). Anything we can't
/// parse falls back to US.
pub fn load_keyboard_layout(name: &str) -> u32 {
    let lcid = u32::from_str_radix(name.trim(), 16)
        .map(|klid| (klid & 0xffff) as u16)
        .unwrap_or(US_LAYOUT as u16);

    fabricate_layout_id(match lcid {
        0 => US_LAYOUT as u16,
        l => l,
    })
}

pub fn activate_keyboard_layout(hkl: u32) -> u32 {
    fabricate_layout_id((hkl & 0xffff) as u16)
}

pub fn get_keyboard_layout_name(hkl: u32) -> String {
    let low = hkl & 0xffff;
    if hkl >> 16 == low {
        return format!("{:08x}", low);
    }

    format!("{:08x}", hkl)
}

/// Translate between virtual keys, scancodes and characters.
/// Returns 0 for anything we can't translate.
pub fn map_virtual_key(code: u32, map_type: u32) -> u32 {
    let vkey = (code & 0xffff) as u16;

    match map_type {
        MAPVK_VK_TO_VSC | MAPVK_VK_TO_VSC_EX => {
            let vkey = match vkey {
                VK_MENU => VK_LMENU,
                VK_SHIFT => VK_LSHIFT,
                VK_CONTROL => VK_LCONTROL,
                v => v,
            };
            let scan = virtual_key_to_target_scancode(vkey) as u32;

            if map_type == MAPVK_VK_TO_VSC {
                scan & 0xff
            } else if scan & EXTENDED as u32 != 0 {
                0xe000 | (scan & 0xff)
            } else {
                scan
            }
        }
        MAPVK_VSC_TO_VK | MAPVK_VSC_TO_VK_EX => {
            // accept both the 0xe0 prefix form and our 0x100 bit
            let scan = match code & 0xff00 {
                0xe000 | 0xe100 => (code & 0xff) as u16 | EXTENDED,
                _ => (code & 0x1ff) as u16,
            };
            let vkey = target_scancode_to_virtual_key(scan);

            match map_type {
                MAPVK_VSC_TO_VK => fold_sided_modifier(vkey) as u32,
                _ => vkey as u32,
            }
        }
        MAPVK_VK_TO_CHAR => {
            if is_digit(vkey) || is_letter(vkey) {
                return vkey as u32;
            }

            match virtual_key_to_display_name(vkey) {
                Some(name) if name.chars().count() == 1 => {
                    name.chars().next().map(|c| c as u32).unwrap_or(0)
                }
                _ => 0,
            }
        }
        _ => 0,
    }
}

// unshifted / shifted character for the OEM punctuation keys
fn oem_pair(vkey: u16) -> Option<(char, char)> {
    Some(match vkey {
        VK_OEM_1 => (';', ':'),
        VK_OEM_2 => ('/', '?'),
        VK_OEM_3 => ('`', '~'),
        VK_OEM_4 => ('[', '{'),
        VK_OEM_5 => ('\\', '|'),
        VK_OEM_6 => (']', '}'),
        VK_OEM_7 => ('\'', '"'),
        VK_OEM_COMMA => (',', '<'),
        VK_OEM_MINUS => ('-', '_'),
        VK_OEM_PERIOD => ('.', '>'),
        VK_OEM_PLUS => ('=', '+'),
        _ => return None,
    })
}

fn key_state(state: &[u8], vkey: u16) -> u8 {
    state.get(vkey as usize).copied().unwrap_or(0)
}

/// Translate a virtual key into the character it types on a US
/// keyboard.
///
/// `state` is indexed by virtual key: 0x80 means the key is held and
/// 0x01 means it is toggled on.
pub fn to_unicode(vkey: u16, scan: u16, state: &[u8]) -> Option<char> {
    if scan & SCAN_KEYUP != 0 {
        return None;
    }

    let shift = key_state(state, VK_SHIFT) & 0x80 != 0;
    let ctrl = key_state(state, VK_CONTROL) & 0x80 != 0;
    let numlock = key_state(state, VK_NUMLOCK) & 0x01 != 0;
    let caps = key_state(state, VK_CAPITAL) & 0x01 != 0;

    if ctrl {
        if is_letter(vkey) {
            return std::char::from_u32((vkey - VK_A + 1) as u32);
        }

        return match vkey {
            VK_OEM_4 => Some('\x1b'),
            VK_OEM_5 => Some('\x1c'),
            VK_OEM_6 => Some('\x1d'),
            VK_SUBTRACT => Some('\x1e'),
            _ => None,
        };
    }

    if let Some((lower, upper)) = oem_pair(vkey) {
        return Some(if shift { upper } else { lower });
    }

    if is_digit(vkey) {
        let idx = (vkey - VK_0) as usize;
        return match shift {
            true => ")!@#$%^&*(".chars().nth(idx),
            false => std::char::from_u32(vkey as u32),
        };
    }

    if is_letter(vkey) {
        let upper = vkey as u8 as char;
        return match shift ^ caps {
            true => Some(upper),
            false => Some(upper.to_ascii_lowercase()),
        };
    }

    if numlock && !shift {
        if vkey >= VK_NUMPAD0 && vkey <= VK_NUMPAD9 {
            return std::char::from_u32(('0' as u16 + vkey - VK_NUMPAD0) as u32);
        }
        if vkey == VK_DECIMAL {
            return Some('.');
        }
    }

    match vkey {
        VK_BACK => Some('\x08'),
        VK_RETURN => Some('\r'),
        VK_SPACE => Some(' '),
        VK_TAB => Some('\t'),
        VK_MULTIPLY => Some('*'),
        VK_ADD => Some('+'),
        VK_SUBTRACT => Some('-'),
        VK_DIVIDE => Some('/'),
        _ => None,
    }
}

/// The key (and modifiers) that types `ch`. -1 if no key does.
pub fn vk_key_scan(ch: char) -> i16 {
    match CHAR_VKEY_MAP.get(ch as usize) {
        Some(code) => *code as i16,
        None => -1,
    }
}

/// The display name of the key described by a key message lparam
pub fn get_key_name_text(lparam: u32) -> String {
    let scan = ((lparam >> 16) & 0x1ff) as u16;

    let mut vkey = target_scancode_to_virtual_key(scan);
    if vkey == 0 && scan & EXTENDED != 0 {
        vkey = target_scancode_to_virtual_key(scan & 0xff);
    }
    if lparam & KEYNAME_DONT_CARE != 0 {
        vkey = fold_sided_modifier(vkey);
    }

    if is_digit(vkey) || is_letter(vkey) {
        return (vkey as u8 as char).to_ascii_lowercase().to_string();
    }

    let (first, second) = match scan & EXTENDED != 0 {
        true => (vkey | EXTENDED, vkey),
        false => (vkey, vkey | EXTENDED),
    };

    match virtual_key_to_display_name(first).or_else(|| virtual_key_to_display_name(second)) {
        Some(name) => name.to_string(),
        None => format!("Key 0x{:02x}", vkey),
    }
}
