//! evdev to USB HID usage mapping
//!
//! Reference: USB HID Usage Tables 1.12, Section 10 (Keyboard/Keypad Page)
//! and Section 15 (Consumer Page 0x0C).

use evdev::Key;

/// USB HID key codes (Usage Page 0x07)
#[allow(dead_code)]
pub mod usb {
    // Letters A-Z (0x04 - 0x1D)
    pub const KEY_A: u8 = 0x04;
    pub const KEY_B: u8 = 0x05;
    pub const KEY_C: u8 = 0x06;
    pub const KEY_D: u8 = 0x07;
    pub const KEY_E: u8 = 0x08;
    pub const KEY_F: u8 = 0x09;
    pub const KEY_G: u8 = 0x0A;
    pub const KEY_H: u8 = 0x0B;
    pub const KEY_I: u8 = 0x0C;
    pub const KEY_J: u8 = 0x0D;
    pub const KEY_K: u8 = 0x0E;
    pub const KEY_L: u8 = 0x0F;
    pub const KEY_M: u8 = 0x10;
    pub const KEY_N: u8 = 0x11;
    pub const KEY_O: u8 = 0x12;
    pub const KEY_P: u8 = 0x13;
    pub const KEY_Q: u8 = 0x14;
    pub const KEY_R: u8 = 0x15;
    pub const KEY_S: u8 = 0x16;
    pub const KEY_T: u8 = 0x17;
    pub const KEY_U: u8 = 0x18;
    pub const KEY_V: u8 = 0x19;
    pub const KEY_W: u8 = 0x1A;
    pub const KEY_X: u8 = 0x1B;
    pub const KEY_Y: u8 = 0x1C;
    pub const KEY_Z: u8 = 0x1D;

    // Numbers 1-9, 0 (0x1E - 0x27)
    pub const KEY_1: u8 = 0x1E;
    pub const KEY_2: u8 = 0x1F;
    pub const KEY_3: u8 = 0x20;
    pub const KEY_4: u8 = 0x21;
    pub const KEY_5: u8 = 0x22;
    pub const KEY_6: u8 = 0x23;
    pub const KEY_7: u8 = 0x24;
    pub const KEY_8: u8 = 0x25;
    pub const KEY_9: u8 = 0x26;
    pub const KEY_0: u8 = 0x27;

    // Control keys
    pub const KEY_ENTER: u8 = 0x28;
    pub const KEY_ESCAPE: u8 = 0x29;
    pub const KEY_BACKSPACE: u8 = 0x2A;
    pub const KEY_TAB: u8 = 0x2B;
    pub const KEY_SPACE: u8 = 0x2C;
    pub const KEY_MINUS: u8 = 0x2D;
    pub const KEY_EQUAL: u8 = 0x2E;
    pub const KEY_LEFT_BRACKET: u8 = 0x2F;
    pub const KEY_RIGHT_BRACKET: u8 = 0x30;
    pub const KEY_BACKSLASH: u8 = 0x31;
    pub const KEY_SEMICOLON: u8 = 0x33;
    pub const KEY_APOSTROPHE: u8 = 0x34;
    pub const KEY_GRAVE: u8 = 0x35;
    pub const KEY_COMMA: u8 = 0x36;
    pub const KEY_PERIOD: u8 = 0x37;
    pub const KEY_SLASH: u8 = 0x38;
    pub const KEY_CAPS_LOCK: u8 = 0x39;

    // Function keys F1-F12
    pub const KEY_F1: u8 = 0x3A;
    pub const KEY_F2: u8 = 0x3B;
    pub const KEY_F3: u8 = 0x3C;
    pub const KEY_F4: u8 = 0x3D;
    pub const KEY_F5: u8 = 0x3E;
    pub const KEY_F6: u8 = 0x3F;
    pub const KEY_F7: u8 = 0x40;
    pub const KEY_F8: u8 = 0x41;
    pub const KEY_F9: u8 = 0x42;
    pub const KEY_F10: u8 = 0x43;
    pub const KEY_F11: u8 = 0x44;
    pub const KEY_F12: u8 = 0x45;

    // Special keys
    pub const KEY_PRINT_SCREEN: u8 = 0x46;
    pub const KEY_SCROLL_LOCK: u8 = 0x47;
    pub const KEY_PAUSE: u8 = 0x48;
    pub const KEY_INSERT: u8 = 0x49;
    pub const KEY_HOME: u8 = 0x4A;
    pub const KEY_PAGE_UP: u8 = 0x4B;
    pub const KEY_DELETE: u8 = 0x4C;
    pub const KEY_END: u8 = 0x4D;
    pub const KEY_PAGE_DOWN: u8 = 0x4E;
    pub const KEY_RIGHT_ARROW: u8 = 0x4F;
    pub const KEY_LEFT_ARROW: u8 = 0x50;
    pub const KEY_DOWN_ARROW: u8 = 0x51;
    pub const KEY_UP_ARROW: u8 = 0x52;

    // Numpad
    pub const KEY_NUM_LOCK: u8 = 0x53;
    pub const KEY_NUMPAD_DIVIDE: u8 = 0x54;
    pub const KEY_NUMPAD_MULTIPLY: u8 = 0x55;
    pub const KEY_NUMPAD_MINUS: u8 = 0x56;
    pub const KEY_NUMPAD_PLUS: u8 = 0x57;
    pub const KEY_NUMPAD_ENTER: u8 = 0x58;
    pub const KEY_NUMPAD_1: u8 = 0x59;
    pub const KEY_NUMPAD_2: u8 = 0x5A;
    pub const KEY_NUMPAD_3: u8 = 0x5B;
    pub const KEY_NUMPAD_4: u8 = 0x5C;
    pub const KEY_NUMPAD_5: u8 = 0x5D;
    pub const KEY_NUMPAD_6: u8 = 0x5E;
    pub const KEY_NUMPAD_7: u8 = 0x5F;
    pub const KEY_NUMPAD_8: u8 = 0x60;
    pub const KEY_NUMPAD_9: u8 = 0x61;
    pub const KEY_NUMPAD_0: u8 = 0x62;
    pub const KEY_NUMPAD_DECIMAL: u8 = 0x63;

    // Additional keys
    pub const KEY_NON_US_BACKSLASH: u8 = 0x64;
    pub const KEY_APPLICATION: u8 = 0x65;

    // Modifiers (0xE0 - 0xE7)
    pub const KEY_LEFT_CTRL: u8 = 0xE0;
    pub const KEY_LEFT_SHIFT: u8 = 0xE1;
    pub const KEY_LEFT_ALT: u8 = 0xE2;
    pub const KEY_LEFT_META: u8 = 0xE3;
    pub const KEY_RIGHT_CTRL: u8 = 0xE4;
    pub const KEY_RIGHT_SHIFT: u8 = 0xE5;
    pub const KEY_RIGHT_ALT: u8 = 0xE6;
    pub const KEY_RIGHT_META: u8 = 0xE7;
}

/// Consumer Control usage codes for multimedia keys (Usage Page 0x0C)
pub mod consumer {
    pub const PLAY_PAUSE: u16 = 0x00CD;
    pub const STOP: u16 = 0x00B7;
    pub const NEXT_TRACK: u16 = 0x00B5;
    pub const PREV_TRACK: u16 = 0x00B6;
    pub const MUTE: u16 = 0x00E2;
    pub const VOLUME_UP: u16 = 0x00E9;
    pub const VOLUME_DOWN: u16 = 0x00EA;
}

/// Map an evdev key to its USB HID keyboard usage, if it has one.
pub fn keyboard_usage(key: Key) -> Option<u8> {
    let usage = match key {
        Key::KEY_A => usb::KEY_A,
        Key::KEY_B => usb::KEY_B,
        Key::KEY_C => usb::KEY_C,
        Key::KEY_D => usb::KEY_D,
        Key::KEY_E => usb::KEY_E,
        Key::KEY_F => usb::KEY_F,
        Key::KEY_G => usb::KEY_G,
        Key::KEY_H => usb::KEY_H,
        Key::KEY_I => usb::KEY_I,
        Key::KEY_J => usb::KEY_J,
        Key::KEY_K => usb::KEY_K,
        Key::KEY_L => usb::KEY_L,
        Key::KEY_M => usb::KEY_M,
        Key::KEY_N => usb::KEY_N,
        Key::KEY_O => usb::KEY_O,
        Key::KEY_P => usb::KEY_P,
        Key::KEY_Q => usb::KEY_Q,
        Key::KEY_R => usb::KEY_R,
        Key::KEY_S => usb::KEY_S,
        Key::KEY_T => usb::KEY_T,
        Key::KEY_U => usb::KEY_U,
        Key::KEY_V => usb::KEY_V,
        Key::KEY_W => usb::KEY_W,
        Key::KEY_X => usb::KEY_X,
        Key::KEY_Y => usb::KEY_Y,
        Key::KEY_Z => usb::KEY_Z,
        Key::KEY_1 => usb::KEY_1,
        Key::KEY_2 => usb::KEY_2,
        Key::KEY_3 => usb::KEY_3,
        Key::KEY_4 => usb::KEY_4,
        Key::KEY_5 => usb::KEY_5,
        Key::KEY_6 => usb::KEY_6,
        Key::KEY_7 => usb::KEY_7,
        Key::KEY_8 => usb::KEY_8,
        Key::KEY_9 => usb::KEY_9,
        Key::KEY_0 => usb::KEY_0,
        Key::KEY_ENTER => usb::KEY_ENTER,
        Key::KEY_ESC => usb::KEY_ESCAPE,
        Key::KEY_BACKSPACE => usb::KEY_BACKSPACE,
        Key::KEY_TAB => usb::KEY_TAB,
        Key::KEY_SPACE => usb::KEY_SPACE,
        Key::KEY_MINUS => usb::KEY_MINUS,
        Key::KEY_EQUAL => usb::KEY_EQUAL,
        Key::KEY_LEFTBRACE => usb::KEY_LEFT_BRACKET,
        Key::KEY_RIGHTBRACE => usb::KEY_RIGHT_BRACKET,
        Key::KEY_BACKSLASH => usb::KEY_BACKSLASH,
        Key::KEY_SEMICOLON => usb::KEY_SEMICOLON,
        Key::KEY_APOSTROPHE => usb::KEY_APOSTROPHE,
        Key::KEY_GRAVE => usb::KEY_GRAVE,
        Key::KEY_COMMA => usb::KEY_COMMA,
        Key::KEY_DOT => usb::KEY_PERIOD,
        Key::KEY_SLASH => usb::KEY_SLASH,
        Key::KEY_CAPSLOCK => usb::KEY_CAPS_LOCK,
        Key::KEY_F1 => usb::KEY_F1,
        Key::KEY_F2 => usb::KEY_F2,
        Key::KEY_F3 => usb::KEY_F3,
        Key::KEY_F4 => usb::KEY_F4,
        Key::KEY_F5 => usb::KEY_F5,
        Key::KEY_F6 => usb::KEY_F6,
        Key::KEY_F7 => usb::KEY_F7,
        Key::KEY_F8 => usb::KEY_F8,
        Key::KEY_F9 => usb::KEY_F9,
        Key::KEY_F10 => usb::KEY_F10,
        Key::KEY_F11 => usb::KEY_F11,
        Key::KEY_F12 => usb::KEY_F12,
        Key::KEY_SYSRQ => usb::KEY_PRINT_SCREEN,
        Key::KEY_SCROLLLOCK => usb::KEY_SCROLL_LOCK,
        Key::KEY_PAUSE => usb::KEY_PAUSE,
        Key::KEY_INSERT => usb::KEY_INSERT,
        Key::KEY_HOME => usb::KEY_HOME,
        Key::KEY_PAGEUP => usb::KEY_PAGE_UP,
        Key::KEY_DELETE => usb::KEY_DELETE,
        Key::KEY_END => usb::KEY_END,
        Key::KEY_PAGEDOWN => usb::KEY_PAGE_DOWN,
        Key::KEY_RIGHT => usb::KEY_RIGHT_ARROW,
        Key::KEY_LEFT => usb::KEY_LEFT_ARROW,
        Key::KEY_DOWN => usb::KEY_DOWN_ARROW,
        Key::KEY_UP => usb::KEY_UP_ARROW,
        Key::KEY_NUMLOCK => usb::KEY_NUM_LOCK,
        Key::KEY_KPSLASH => usb::KEY_NUMPAD_DIVIDE,
        Key::KEY_KPASTERISK => usb::KEY_NUMPAD_MULTIPLY,
        Key::KEY_KPMINUS => usb::KEY_NUMPAD_MINUS,
        Key::KEY_KPPLUS => usb::KEY_NUMPAD_PLUS,
        Key::KEY_KPENTER => usb::KEY_NUMPAD_ENTER,
        Key::KEY_KP1 => usb::KEY_NUMPAD_1,
        Key::KEY_KP2 => usb::KEY_NUMPAD_2,
        Key::KEY_KP3 => usb::KEY_NUMPAD_3,
        Key::KEY_KP4 => usb::KEY_NUMPAD_4,
        Key::KEY_KP5 => usb::KEY_NUMPAD_5,
        Key::KEY_KP6 => usb::KEY_NUMPAD_6,
        Key::KEY_KP7 => usb::KEY_NUMPAD_7,
        Key::KEY_KP8 => usb::KEY_NUMPAD_8,
        Key::KEY_KP9 => usb::KEY_NUMPAD_9,
        Key::KEY_KP0 => usb::KEY_NUMPAD_0,
        Key::KEY_KPDOT => usb::KEY_NUMPAD_DECIMAL,
        Key::KEY_102ND => usb::KEY_NON_US_BACKSLASH,
        Key::KEY_COMPOSE => usb::KEY_APPLICATION,
        Key::KEY_LEFTCTRL => usb::KEY_LEFT_CTRL,
        Key::KEY_LEFTSHIFT => usb::KEY_LEFT_SHIFT,
        Key::KEY_LEFTALT => usb::KEY_LEFT_ALT,
        Key::KEY_LEFTMETA => usb::KEY_LEFT_META,
        Key::KEY_RIGHTCTRL => usb::KEY_RIGHT_CTRL,
        Key::KEY_RIGHTSHIFT => usb::KEY_RIGHT_SHIFT,
        Key::KEY_RIGHTALT => usb::KEY_RIGHT_ALT,
        Key::KEY_RIGHTMETA => usb::KEY_RIGHT_META,
        _ => return None,
    };
    Some(usage)
}

/// Map an evdev multimedia key to its Consumer Control usage.
pub fn consumer_usage(key: Key) -> Option<u16> {
    let usage = match key {
        Key::KEY_PLAYPAUSE => consumer::PLAY_PAUSE,
        Key::KEY_STOPCD => consumer::STOP,
        Key::KEY_NEXTSONG => consumer::NEXT_TRACK,
        Key::KEY_PREVIOUSSONG => consumer::PREV_TRACK,
        Key::KEY_MUTE => consumer::MUTE,
        Key::KEY_VOLUMEUP => consumer::VOLUME_UP,
        Key::KEY_VOLUMEDOWN => consumer::VOLUME_DOWN,
        _ => return None,
    };
    Some(usage)
}

/// Map an evdev button to its HID mouse report bit.
pub fn mouse_button_bit(key: Key) -> Option<u8> {
    let bit = match key {
        Key::BTN_LEFT => 0x01,
        Key::BTN_RIGHT => 0x02,
        Key::BTN_MIDDLE => 0x04,
        Key::BTN_SIDE => 0x08,
        Key::BTN_EXTRA => 0x10,
        _ => return None,
    };
    Some(bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_modifiers_map() {
        assert_eq!(keyboard_usage(Key::KEY_A), Some(0x04));
        assert_eq!(keyboard_usage(Key::KEY_LEFTCTRL), Some(0xE0));
        assert_eq!(keyboard_usage(Key::KEY_RIGHTALT), Some(0xE6));
    }

    #[test]
    fn unmapped_keys_yield_none() {
        assert_eq!(keyboard_usage(Key::KEY_MICMUTE), None);
        assert_eq!(consumer_usage(Key::KEY_A), None);
        assert_eq!(mouse_button_bit(Key::KEY_A), None);
    }

    #[test]
    fn usage_pages_are_disjoint() {
        assert!(consumer_usage(Key::KEY_VOLUMEUP).is_some());
        assert!(mouse_button_bit(Key::KEY_VOLUMEUP).is_none());
        assert!(mouse_button_bit(Key::BTN_LEFT).is_some());
        assert!(consumer_usage(Key::BTN_LEFT).is_none());
        assert!(keyboard_usage(Key::BTN_LEFT).is_none());
    }
}
