// Tests for the keycode tables and layout queries
//
// Austin Shafer - 2020
use super::layout::*;
use super::vkeys::*;
use super::*;

#[test]
fn evdev_letters_and_digits() {
    assert_eq!(scancode_to_virtual_key(30), vk_char(b'A'));
    assert_eq!(scancode_to_virtual_key(44), vk_char(b'Z'));
    assert_eq!(scancode_to_virtual_key(2), vk_char(b'1'));
    assert_eq!(scancode_to_virtual_key(11), vk_char(b'0'));
    assert_eq!(scancode_to_virtual_key(111), VK_DELETE);
    assert_eq!(scancode_to_virtual_key(96), VK_RETURN);
    assert_eq!(scancode_to_virtual_key(125), VK_LWIN);
}

#[test]
fn unmapped_scancodes_are_no_key() {
    assert_eq!(scancode_to_virtual_key(0), 0);
    assert_eq!(scancode_to_virtual_key(84), 0);
    assert_eq!(scancode_to_virtual_key(KEY_MAX), 0);
    assert_eq!(scancode_to_virtual_key(KEY_MAX + 1), 0);
    assert_eq!(scancode_to_virtual_key(u32::MAX), 0);
}

#[test]
fn every_evdev_key_has_a_target_scancode() {
    for code in CT_EVDEV_TO_VK.keys() {
        let vkey = scancode_to_virtual_key(code);
        assert_ne!(vkey, 0, "evdev {} has no virtual key", code);
        assert_ne!(
            virtual_key_to_target_scancode(vkey),
            0,
            "vkey 0x{:x} has no scancode",
            vkey
        );
    }
}

#[test]
fn target_scancodes_are_unique() {
    let keys: Vec<u16> = CT_VK_TO_SCAN.keys().collect();
    let mut scans: Vec<u16> = keys
        .iter()
        .map(|vk| virtual_key_to_target_scancode(*vk))
        .collect();
    scans.sort();
    scans.dedup();
    assert_eq!(scans.len(), keys.len());
}

#[test]
fn scancode_round_trip() {
    for vkey in CT_VK_TO_SCAN.keys() {
        let scan = virtual_key_to_target_scancode(vkey);
        assert_eq!(target_scancode_to_virtual_key(scan), vkey);
    }
    assert_eq!(target_scancode_to_virtual_key(0), 0);
    assert_eq!(target_scancode_to_virtual_key(0x1ff), 0);
}

#[test]
fn extended_bit() {
    assert!(is_extended(virtual_key_to_target_scancode(VK_RCONTROL)));
    assert!(is_extended(virtual_key_to_target_scancode(VK_DIVIDE)));
    assert!(!is_extended(virtual_key_to_target_scancode(vk_char(b'A'))));
    assert!(!is_extended(virtual_key_to_target_scancode(VK_LCONTROL)));
}

#[test]
fn sided_modifiers_fold_only_when_asked() {
    let lshift = virtual_key_to_target_scancode(VK_LSHIFT) as u32;
    let rshift = virtual_key_to_target_scancode(VK_RSHIFT) as u32;

    assert_eq!(map_virtual_key(lshift, MAPVK_VSC_TO_VK), VK_SHIFT as u32);
    assert_eq!(map_virtual_key(rshift, MAPVK_VSC_TO_VK), VK_SHIFT as u32);
    assert_eq!(map_virtual_key(lshift, MAPVK_VSC_TO_VK_EX), VK_LSHIFT as u32);
    assert_eq!(map_virtual_key(rshift, MAPVK_VSC_TO_VK_EX), VK_RSHIFT as u32);

    assert_eq!(map_virtual_key(0xe01d, MAPVK_VSC_TO_VK), VK_CONTROL as u32);
    assert_eq!(map_virtual_key(0xe01d, MAPVK_VSC_TO_VK_EX), VK_RCONTROL as u32);
    assert_eq!(map_virtual_key(0x38, MAPVK_VSC_TO_VK), VK_MENU as u32);
}

#[test]
fn generic_modifiers_resolve_left() {
    assert_eq!(map_virtual_key(VK_SHIFT as u32, MAPVK_VK_TO_VSC), 0x2a);
    assert_eq!(map_virtual_key(VK_CONTROL as u32, MAPVK_VK_TO_VSC), 0x1d);
    assert_eq!(map_virtual_key(VK_MENU as u32, MAPVK_VK_TO_VSC), 0x38);
    assert_eq!(map_virtual_key(VK_RCONTROL as u32, MAPVK_VK_TO_VSC), 0x1d);
    assert_eq!(map_virtual_key(VK_RCONTROL as u32, MAPVK_VK_TO_VSC_EX), 0xe01d);
    assert_eq!(map_virtual_key(VK_F1 as u32, 42), 0);
}

#[test]
fn vk_to_char() {
    assert_eq!(map_virtual_key(vk_char(b'Q') as u32, MAPVK_VK_TO_CHAR), 'Q' as u32);
    assert_eq!(map_virtual_key(vk_char(b'7') as u32, MAPVK_VK_TO_CHAR), '7' as u32);
    assert_eq!(map_virtual_key(VK_OEM_1 as u32, MAPVK_VK_TO_CHAR), ';' as u32);
    assert_eq!(map_virtual_key(VK_ESCAPE as u32, MAPVK_VK_TO_CHAR), 0);
}

#[test]
fn letters_follow_shift_xor_caps() {
    let mut state = [0u8; 256];

    for c in b'A'..=b'Z' {
        let vkey = vk_char(c);
        let upper = c as char;
        let lower = upper.to_ascii_lowercase();

        state[VK_SHIFT as usize] = 0;
        state[VK_CAPITAL as usize] = 0;
        assert_eq!(to_unicode(vkey, 0, &state), Some(lower));

        state[VK_SHIFT as usize] = 0x80;
        assert_eq!(to_unicode(vkey, 0, &state), Some(upper));

        state[VK_CAPITAL as usize] = 0x01;
        assert_eq!(to_unicode(vkey, 0, &state), Some(lower));

        state[VK_SHIFT as usize] = 0;
        assert_eq!(to_unicode(vkey, 0, &state), Some(upper));
    }
}

#[test]
fn unicode_punctuation_and_control() {
    let mut state = [0u8; 256];
    assert_eq!(to_unicode(vk_char(b'2'), 0, &state), Some('2'));
    assert_eq!(to_unicode(VK_OEM_4, 0, &state), Some('['));
    assert_eq!(to_unicode(VK_RETURN, 0, &state), Some('\r'));
    assert_eq!(to_unicode(VK_NUMPAD5, 0, &state), None);
    assert_eq!(to_unicode(VK_F1, 0, &state), None);

    state[VK_NUMLOCK as usize] = 0x01;
    assert_eq!(to_unicode(VK_NUMPAD5, 0, &state), Some('5'));
    assert_eq!(to_unicode(VK_DECIMAL, 0, &state), Some('.'));

    state[VK_SHIFT as usize] = 0x80;
    assert_eq!(to_unicode(vk_char(b'2'), 0, &state), Some('@'));
    assert_eq!(to_unicode(VK_OEM_4, 0, &state), Some('{'));
    assert_eq!(to_unicode(VK_NUMPAD5, 0, &state), None);

    state[VK_CONTROL as usize] = 0x80;
    assert_eq!(to_unicode(vk_char(b'C'), 0, &state), Some('\x03'));
    assert_eq!(to_unicode(VK_OEM_5, 0, &state), Some('\x1c'));

    // key releases never type anything
    assert_eq!(to_unicode(vk_char(b'C'), 0x802e, &state), None);
}

#[test]
fn char_to_key() {
    assert_eq!(vk_key_scan('a'), 0x041);
    assert_eq!(vk_key_scan('A'), 0x141);
    assert_eq!(vk_key_scan('@'), 0x132);
    assert_eq!(vk_key_scan(' '), 0x020);
    assert_eq!(vk_key_scan('\r'), 0x00d);
    assert_eq!(vk_key_scan('\u{7f}'), 0x208);
    assert_eq!(vk_key_scan('é'), -1);
}

#[test]
fn key_names() {
    // lparam carries the scancode in bits 16..24
    let lp = |scan: u32| scan << 16;

    assert_eq!(get_key_name_text(lp(0x1e)), "a");
    assert_eq!(get_key_name_text(lp(0x0b)), "0");
    assert_eq!(get_key_name_text(lp(0x01)), "Esc");
    assert_eq!(get_key_name_text(lp(0x153)), "Delete");
    assert_eq!(get_key_name_text(lp(0x1c)), "Return");
    assert_eq!(get_key_name_text(lp(0x11c)), "Num Enter");
    assert_eq!(get_key_name_text(lp(0x11d)), "Right Ctrl");
    assert_eq!(get_key_name_text(lp(0x36)), "Right Shift");
    assert_eq!(get_key_name_text(lp(0x36) | 1 << 25), "Shift");
    assert_eq!(get_key_name_text(lp(0x7f)), "Key 0x00");
}

#[test]
fn layout_ids() {
    assert_eq!(get_keyboard_layout(), 0x0409);
    assert_eq!(fabricate_layout_id(0x0409), 0x04090409);
    assert_eq!(fabricate_layout_id(0x0411), 0xe0010411);
    assert_eq!(load_keyboard_layout("00000407"), 0x04070407);
    assert_eq!(load_keyboard_layout("garbage"), 0x04090409);
    assert_eq!(activate_keyboard_layout(0x04120412), 0xe0010412);
    assert_eq!(get_keyboard_layout_name(0x04090409), "00000409");
    assert_eq!(get_keyboard_layout_name(0xe0010411), "e0010411");
}
