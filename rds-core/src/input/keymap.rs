//! Key code tables.
//!
//! Canonical keycodes are Linux evdev codes plus 8, the X keycode space.
//! Remote keys arrive either as PC/XT (set 1) scancodes or as Windows
//! virtual-key codes; both are funnelled through the scancode table.

/// Offset between evdev codes and canonical keycodes.
pub const EVDEV_OFFSET: u32 = 8;

pub const CAPS_LOCK_KEYCODE: u8 = 66;
pub const NUM_LOCK_KEYCODE: u8 = 77;
pub const SCROLL_LOCK_KEYCODE: u8 = 78;

/// Keycode whose symbols are rebound for each unicode key event.
pub const UNICODE_KEYCODE: u8 = 255;

/// Bit a virtual-key code carries for extended keys.
pub const VK_EXTENDED: u32 = 0x100;

/// Keyboard type value for Korean keyboards.
const KEYBOARD_TYPE_KOREAN: u32 = 8;

// ── Scancodes ────────────────────────────────────────────────────

// evdev codes of keys that only exist as extended scancodes.
const KEY_KPENTER: u32 = 96;
const KEY_RIGHTCTRL: u32 = 97;
const KEY_KPSLASH: u32 = 98;
const KEY_SYSRQ: u32 = 99;
const KEY_RIGHTALT: u32 = 100;
const KEY_HOME: u32 = 102;
const KEY_UP: u32 = 103;
const KEY_PAGEUP: u32 = 104;
const KEY_LEFT: u32 = 105;
const KEY_RIGHT: u32 = 106;
const KEY_END: u32 = 107;
const KEY_DOWN: u32 = 108;
const KEY_PAGEDOWN: u32 = 109;
const KEY_INSERT: u32 = 110;
const KEY_DELETE: u32 = 111;
const KEY_MUTE: u32 = 113;
const KEY_VOLUMEDOWN: u32 = 114;
const KEY_VOLUMEUP: u32 = 115;
const KEY_PAUSE: u32 = 119;
const KEY_HANGEUL: u32 = 122;
const KEY_HANJA: u32 = 123;
const KEY_YEN: u32 = 124;
const KEY_LEFTMETA: u32 = 125;
const KEY_RIGHTMETA: u32 = 126;
const KEY_COMPOSE: u32 = 127;
const KEY_RO: u32 = 89;
const KEY_KATAKANAHIRAGANA: u32 = 93;
const KEY_HENKAN: u32 = 92;
const KEY_MUHENKAN: u32 = 94;
const KEY_NEXTSONG: u32 = 163;
const KEY_PLAYPAUSE: u32 = 164;
const KEY_PREVIOUSSONG: u32 = 165;
const KEY_STOPCD: u32 = 166;

/// Translate a set-1 scancode to an evdev code.
///
/// Non-extended scancodes `0x01..=0x53` and `0x56..=0x58` coincide with
/// evdev codes. Returns `None` for codes without a mapping.
pub fn scancode_to_evdev(
    scancode: u32,
    extended: bool,
    extended1: bool,
    keyboard_type: u32,
) -> Option<u32> {
    let scancode = scancode & 0xFF;

    if extended1 {
        return (scancode == 0x1D).then_some(KEY_PAUSE);
    }

    if keyboard_type == KEYBOARD_TYPE_KOREAN {
        match scancode {
            0x71 | 0xF1 => return Some(KEY_HANJA),
            0x72 | 0xF2 => return Some(KEY_HANGEUL),
            _ => {}
        }
    }

    if extended {
        return match scancode {
            0x10 => Some(KEY_PREVIOUSSONG),
            0x19 => Some(KEY_NEXTSONG),
            0x1C => Some(KEY_KPENTER),
            0x1D => Some(KEY_RIGHTCTRL),
            0x20 => Some(KEY_MUTE),
            0x22 => Some(KEY_PLAYPAUSE),
            0x24 => Some(KEY_STOPCD),
            0x2E => Some(KEY_VOLUMEDOWN),
            0x30 => Some(KEY_VOLUMEUP),
            0x35 => Some(KEY_KPSLASH),
            0x37 => Some(KEY_SYSRQ),
            0x38 => Some(KEY_RIGHTALT),
            0x46 => Some(KEY_PAUSE),
            0x47 => Some(KEY_HOME),
            0x48 => Some(KEY_UP),
            0x49 => Some(KEY_PAGEUP),
            0x4B => Some(KEY_LEFT),
            0x4D => Some(KEY_RIGHT),
            0x4F => Some(KEY_END),
            0x50 => Some(KEY_DOWN),
            0x51 => Some(KEY_PAGEDOWN),
            0x52 => Some(KEY_INSERT),
            0x53 => Some(KEY_DELETE),
            0x5B => Some(KEY_LEFTMETA),
            0x5C => Some(KEY_RIGHTMETA),
            0x5D => Some(KEY_COMPOSE),
            _ => None,
        };
    }

    match scancode {
        0x01..=0x53 | 0x56..=0x58 => Some(scancode),
        0x54 => Some(KEY_SYSRQ),
        0x70 => Some(KEY_KATAKANAHIRAGANA),
        0x73 => Some(KEY_RO),
        0x79 => Some(KEY_HENKAN),
        0x7B => Some(KEY_MUHENKAN),
        0x7D => Some(KEY_YEN),
        _ => None,
    }
}

/// Canonical keycode for a scancode event.
pub fn scancode_to_keycode(
    scancode: u32,
    extended: bool,
    extended1: bool,
    keyboard_type: u32,
) -> Option<u8> {
    scancode_to_evdev(scancode, extended, extended1, keyboard_type)
        .and_then(|code| u8::try_from(code + EVDEV_OFFSET).ok())
}

// ── Virtual keys ─────────────────────────────────────────────────

/// `(virtual key, scancode, always extended)`
const VIRTUAL_KEYS: &[(u8, u8, bool)] = &[
    (0x08, 0x0E, false), // BACK
    (0x09, 0x0F, false), // TAB
    (0x0D, 0x1C, false), // RETURN
    (0x10, 0x2A, false), // SHIFT
    (0x11, 0x1D, false), // CONTROL
    (0x12, 0x38, false), // MENU
    (0x14, 0x3A, false), // CAPITAL
    (0x1B, 0x01, false), // ESCAPE
    (0x20, 0x39, false), // SPACE
    (0x21, 0x49, false), // PRIOR
    (0x22, 0x51, false), // NEXT
    (0x23, 0x4F, false), // END
    (0x24, 0x47, false), // HOME
    (0x25, 0x4B, false), // LEFT
    (0x26, 0x48, false), // UP
    (0x27, 0x4D, false), // RIGHT
    (0x28, 0x50, false), // DOWN
    (0x2C, 0x37, true),  // SNAPSHOT
    (0x2D, 0x52, false), // INSERT
    (0x2E, 0x53, false), // DELETE
    (0x30, 0x0B, false),
    (0x31, 0x02, false),
    (0x32, 0x03, false),
    (0x33, 0x04, false),
    (0x34, 0x05, false),
    (0x35, 0x06, false),
    (0x36, 0x07, false),
    (0x37, 0x08, false),
    (0x38, 0x09, false),
    (0x39, 0x0A, false),
    (0x41, 0x1E, false), // A
    (0x42, 0x30, false),
    (0x43, 0x2E, false),
    (0x44, 0x20, false),
    (0x45, 0x12, false),
    (0x46, 0x21, false),
    (0x47, 0x22, false),
    (0x48, 0x23, false),
    (0x49, 0x17, false),
    (0x4A, 0x24, false),
    (0x4B, 0x25, false),
    (0x4C, 0x26, false),
    (0x4D, 0x32, false),
    (0x4E, 0x31, false),
    (0x4F, 0x18, false),
    (0x50, 0x19, false),
    (0x51, 0x10, false),
    (0x52, 0x13, false),
    (0x53, 0x1F, false),
    (0x54, 0x14, false),
    (0x55, 0x16, false),
    (0x56, 0x2F, false),
    (0x57, 0x11, false),
    (0x58, 0x2D, false),
    (0x59, 0x15, false),
    (0x5A, 0x2C, false), // Z
    (0x5B, 0x5B, true),  // LWIN
    (0x5C, 0x5C, true),  // RWIN
    (0x5D, 0x5D, true),  // APPS
    (0x60, 0x52, false), // NUMPAD0
    (0x61, 0x4F, false),
    (0x62, 0x50, false),
    (0x63, 0x51, false),
    (0x64, 0x4B, false),
    (0x65, 0x4C, false),
    (0x66, 0x4D, false),
    (0x67, 0x47, false),
    (0x68, 0x48, false),
    (0x69, 0x49, false), // NUMPAD9
    (0x6A, 0x37, false), // MULTIPLY
    (0x6B, 0x4E, false), // ADD
    (0x6D, 0x4A, false), // SUBTRACT
    (0x6E, 0x53, false), // DECIMAL
    (0x6F, 0x35, true),  // DIVIDE
    (0x70, 0x3B, false), // F1
    (0x71, 0x3C, false),
    (0x72, 0x3D, false),
    (0x73, 0x3E, false),
    (0x74, 0x3F, false),
    (0x75, 0x40, false),
    (0x76, 0x41, false),
    (0x77, 0x42, false),
    (0x78, 0x43, false),
    (0x79, 0x44, false), // F10
    (0x7A, 0x57, false), // F11
    (0x7B, 0x58, false), // F12
    (0x90, 0x45, false), // NUMLOCK
    (0x91, 0x46, false), // SCROLL
    (0xA0, 0x2A, false), // LSHIFT
    (0xA1, 0x36, false), // RSHIFT
    (0xA2, 0x1D, false), // LCONTROL
    (0xA3, 0x1D, true),  // RCONTROL
    (0xA4, 0x38, false), // LMENU
    (0xA5, 0x38, true),  // RMENU
    (0xBA, 0x27, false), // OEM_1
    (0xBB, 0x0D, false), // OEM_PLUS
    (0xBC, 0x33, false), // OEM_COMMA
    (0xBD, 0x0C, false), // OEM_MINUS
    (0xBE, 0x34, false), // OEM_PERIOD
    (0xBF, 0x35, false), // OEM_2
    (0xC0, 0x29, false), // OEM_3
    (0xDB, 0x1A, false), // OEM_4
    (0xDC, 0x2B, false), // OEM_5
    (0xDD, 0x1B, false), // OEM_6
    (0xDE, 0x28, false), // OEM_7
    (0xE2, 0x56, false), // OEM_102
];

/// Canonical keycode for a virtual-key code. Bit [`VK_EXTENDED`] selects
/// the extended variant (right-hand modifiers, navigation block, keypad
/// enter).
pub fn virtual_key_to_keycode(vk: u32) -> Option<u8> {
    let extended = vk & VK_EXTENDED != 0;
    let code = (vk & 0xFF) as u8;

    if code == 0x13 {
        // PAUSE
        return scancode_to_keycode(0x1D, false, true, 0);
    }

    let &(_, scancode, always_extended) = VIRTUAL_KEYS.iter().find(|(v, _, _)| *v == code)?;
    scancode_to_keycode(scancode as u32, extended || always_extended, false, 0)
}

// ── Keypad remap ─────────────────────────────────────────────────

/// Rewrite keypad arrow keycodes to the cursor block.
pub fn keypad_to_cursor(keycode: u8) -> u8 {
    match keycode {
        80 => 111, // KP_Up -> Up
        83 => 113, // KP_Left -> Left
        85 => 114, // KP_Right -> Right
        88 => 116, // KP_Down -> Down
        other => other,
    }
}

// ── Unicode ──────────────────────────────────────────────────────

/// Keysym for a unicode code point, or `None` for control characters and
/// values outside the unicode range.
pub fn unicode_keysym(code: u32) -> Option<u32> {
    match code {
        0..=0x1F | 0x7F..=0x9F => None,
        0x20..=0xFF => Some(code),
        0x100..=0x10_FFFF => Some(code | 0x0100_0000),
        _ => None,
    }
}

// ── Layouts ──────────────────────────────────────────────────────

const LAYOUTS: &[(u32, &str)] = &[
    (0x0000_0409, "us"),
    (0x0000_0407, "de"),
    (0x0001_0407, "de"),
    (0x0000_040C, "fr"),
    (0x0000_0405, "cz"),
    (0x0002_0409, "us_intl"),
    (0x0001_0409, "dvorak"),
    (0x0000_0406, "dk"),
    (0x0000_0809, "gb"),
    (0x0000_1809, "ie"),
    (0x0000_040A, "es"),
    (0x0000_080C, "be"),
    (0x0000_040E, "hu"),
    (0x0000_0410, "it"),
    (0x0000_0813, "be"),
    (0x0000_0414, "no"),
    (0x0000_0419, "ru"),
];

/// Layout name for a Windows keyboard layout id.
pub fn layout_name(layout_id: u32) -> Option<&'static str> {
    LAYOUTS
        .iter()
        .find(|(id, _)| *id == layout_id)
        .map(|(_, name)| *name)
}

/// Like [`layout_name`], falling back to `"us"`.
pub fn layout_name_or_default(layout_id: u32) -> &'static str {
    layout_name(layout_id).unwrap_or("us")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_scancodes_are_evdev_plus_eight() {
        assert_eq!(scancode_to_keycode(0x01, false, false, 4), Some(9)); // Esc
        assert_eq!(scancode_to_keycode(0x1E, false, false, 4), Some(38)); // A
        assert_eq!(scancode_to_keycode(0x3A, false, false, 4), Some(CAPS_LOCK_KEYCODE));
        assert_eq!(scancode_to_keycode(0x45, false, false, 4), Some(NUM_LOCK_KEYCODE));
        assert_eq!(scancode_to_keycode(0x46, false, false, 4), Some(SCROLL_LOCK_KEYCODE));
        assert_eq!(scancode_to_keycode(0x48, false, false, 4), Some(80)); // KP_Up
    }

    #[test]
    fn extended_scancodes() {
        assert_eq!(scancode_to_keycode(0x48, true, false, 4), Some(111)); // Up
        assert_eq!(scancode_to_keycode(0x1D, true, false, 4), Some(105)); // RCtrl
        assert_eq!(scancode_to_keycode(0x1D, false, true, 4), Some(127)); // Pause
        assert_eq!(scancode_to_keycode(0x66, true, false, 4), None);
    }

    #[test]
    fn virtual_keys() {
        assert_eq!(virtual_key_to_keycode(0x41), Some(38)); // A
        assert_eq!(virtual_key_to_keycode(0x0D), Some(36)); // Return
        assert_eq!(virtual_key_to_keycode(0x0D | VK_EXTENDED), Some(104)); // KP_Enter
        assert_eq!(virtual_key_to_keycode(0x26 | VK_EXTENDED), Some(111)); // Up
        assert_eq!(virtual_key_to_keycode(0x5B), Some(133)); // LWin
        assert_eq!(virtual_key_to_keycode(0xFF), None);
    }

    #[test]
    fn keypad_remap() {
        assert_eq!(keypad_to_cursor(80), 111);
        assert_eq!(keypad_to_cursor(83), 113);
        assert_eq!(keypad_to_cursor(85), 114);
        assert_eq!(keypad_to_cursor(88), 116);
        assert_eq!(keypad_to_cursor(38), 38);
    }

    #[test]
    fn unicode_ranges() {
        assert_eq!(unicode_keysym(0x1F), None);
        assert_eq!(unicode_keysym(0x41), Some(0x41));
        assert_eq!(unicode_keysym(0x7F), None);
        assert_eq!(unicode_keysym(0x9F), None);
        assert_eq!(unicode_keysym(0xE9), Some(0xE9));
        assert_eq!(unicode_keysym(0x20AC), Some(0x0100_20AC));
        assert_eq!(unicode_keysym(0x11_0000), None);
    }

    #[test]
    fn layouts() {
        assert_eq!(layout_name(0x407), Some("de"));
        assert_eq!(layout_name(0x10409), Some("dvorak"));
        assert_eq!(layout_name_or_default(0x12345), "us");
    }
}
