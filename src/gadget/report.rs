//! USB HID boot-protocol report bookkeeping

/// Modifier usages occupy 0xE0..=0xE7 on the keyboard page and are reported
/// as bits in the first report byte rather than key slots.
const MODIFIER_BASE: u8 = 0xE0;
const MODIFIER_MAX: u8 = 0xE7;

/// USB HID keyboard report (8 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier byte
    pub modifiers: u8,
    /// Key codes (up to 6 simultaneous keys)
    pub keys: [u8; 6],
}

impl KeyboardReport {
    /// Convert to bytes for USB HID
    pub fn to_bytes(&self) -> [u8; 8] {
        [
            self.modifiers,
            0, // reserved
            self.keys[0],
            self.keys[1],
            self.keys[2],
            self.keys[3],
            self.keys[4],
            self.keys[5],
        ]
    }

    /// Register a key press. Modifier usages set their bit; regular keys take
    /// the first free slot. Returns false if all six slots are occupied.
    pub fn press(&mut self, usage: u8) -> bool {
        if let Some(bit) = modifier_bit(usage) {
            self.modifiers |= bit;
            return true;
        }
        if self.keys.contains(&usage) {
            return true;
        }
        for slot in &mut self.keys {
            if *slot == 0 {
                *slot = usage;
                return true;
            }
        }
        false
    }

    /// Register a key release.
    pub fn release(&mut self, usage: u8) {
        if let Some(bit) = modifier_bit(usage) {
            self.modifiers &= !bit;
            return;
        }
        for slot in &mut self.keys {
            if *slot == usage {
                *slot = 0;
            }
        }
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.modifiers = 0;
        self.keys = [0; 6];
    }

    /// True when no key or modifier is held.
    pub fn is_empty(&self) -> bool {
        self.modifiers == 0 && self.keys == [0; 6]
    }
}

fn modifier_bit(usage: u8) -> Option<u8> {
    if (MODIFIER_BASE..=MODIFIER_MAX).contains(&usage) {
        Some(1 << (usage - MODIFIER_BASE))
    } else {
        None
    }
}

/// USB HID relative mouse report (4 bytes)
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseReport {
    /// Button state bitmask
    pub buttons: u8,
    /// X movement (-127 to 127)
    pub x: i8,
    /// Y movement (-127 to 127)
    pub y: i8,
    /// Wheel movement (-127 to 127)
    pub wheel: i8,
}

impl MouseReport {
    /// Convert to bytes for USB HID
    pub fn to_bytes(&self) -> [u8; 4] {
        [self.buttons, self.x as u8, self.y as u8, self.wheel as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_fills_slots_in_order() {
        let mut report = KeyboardReport::default();
        assert!(report.press(0x04)); // A
        assert!(report.press(0x05)); // B
        assert_eq!(report.keys[0], 0x04);
        assert_eq!(report.keys[1], 0x05);

        report.release(0x04);
        assert_eq!(report.keys[0], 0x00);
        assert_eq!(report.keys[1], 0x05);
    }

    #[test]
    fn press_is_idempotent_per_key() {
        let mut report = KeyboardReport::default();
        assert!(report.press(0x04));
        assert!(report.press(0x04));
        assert_eq!(report.keys.iter().filter(|&&k| k == 0x04).count(), 1);
    }

    #[test]
    fn seventh_key_is_rejected() {
        let mut report = KeyboardReport::default();
        for usage in 0x04..0x0A {
            assert!(report.press(usage));
        }
        assert!(!report.press(0x0A));
    }

    #[test]
    fn modifiers_use_the_modifier_byte() {
        let mut report = KeyboardReport::default();
        assert!(report.press(0xE0)); // left ctrl
        assert!(report.press(0xE6)); // right alt
        assert_eq!(report.modifiers, 0x01 | 0x40);
        assert_eq!(report.keys, [0; 6]);

        report.release(0xE0);
        assert_eq!(report.modifiers, 0x40);
    }

    #[test]
    fn clear_empties_everything() {
        let mut report = KeyboardReport::default();
        report.press(0xE1);
        report.press(0x04);
        assert!(!report.is_empty());
        report.clear();
        assert!(report.is_empty());
        assert_eq!(report.to_bytes(), [0; 8]);
    }

    #[test]
    fn mouse_report_round_trips_negative_deltas() {
        let report = MouseReport {
            buttons: 0x01,
            x: -5,
            y: 3,
            wheel: -1,
        };
        assert_eq!(report.to_bytes(), [0x01, 0xFB, 0x03, 0xFF]);
    }
}
