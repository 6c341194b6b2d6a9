//! Relay toggle shortcut
//!
//! Tracks the pressed state of a configured key combination across all relay
//! workers. When every shortcut key is down at once, relaying flips between
//! active and paused. Pausing releases everything currently held on the host
//! side so no key stays stuck.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::gadget::GadgetManager;
use crate::relay::ActivationFlag;
use crate::translate::{KeyPress, KeyState};

/// Watches key events for the toggle combination
pub struct ShortcutToggler {
    shortcut: HashSet<String>,
    pressed: Mutex<HashSet<String>>,
    activation: Arc<ActivationFlag>,
    gadgets: Arc<GadgetManager>,
}

/// Canonical key name form: uppercase without the `KEY_` prefix, so
/// "leftctrl", "KEY_LEFTCTRL" and "LeftCtrl" all configure the same key.
fn normalize_key_name(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    upper
        .strip_prefix("KEY_")
        .map(str::to_string)
        .unwrap_or(upper)
}

impl ShortcutToggler {
    pub fn new(
        shortcut_keys: &[String],
        activation: Arc<ActivationFlag>,
        gadgets: Arc<GadgetManager>,
    ) -> Self {
        let shortcut: HashSet<String> = shortcut_keys
            .iter()
            .map(|k| normalize_key_name(k))
            .collect();
        if !shortcut.is_empty() {
            info!("relay toggle shortcut: {:?}", shortcut);
        }
        Self {
            shortcut,
            pressed: Mutex::new(HashSet::new()),
            activation,
            gadgets,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.shortcut.is_empty()
    }

    /// Feed one key transition. Returns true when the transition completed the
    /// shortcut and the relay state was toggled.
    pub fn handle_key_event(&self, press: &KeyPress) -> bool {
        if self.shortcut.is_empty() {
            return false;
        }
        let name = normalize_key_name(&crate::translate::key_name(press.key));
        if !self.shortcut.contains(&name) {
            return false;
        }

        let mut pressed = self.pressed.lock();
        match press.state {
            KeyState::Down => {
                pressed.insert(name);
                if self.shortcut.iter().all(|k| pressed.contains(k)) {
                    drop(pressed);
                    self.toggle_relaying();
                    // held keys only re-toggle after a release and re-press
                    self.pressed.lock().clear();
                    return true;
                }
            }
            KeyState::Up => {
                pressed.remove(&name);
            }
            KeyState::Repeat => {}
        }
        false
    }

    fn toggle_relaying(&self) {
        if self.activation.is_active() {
            // release everything held on the host before going quiet
            if let Some(keyboard) = self.gadgets.keyboard() {
                if let Err(e) = keyboard.release_all() {
                    warn!("failed to release keyboard on pause: {e}");
                }
            }
            if let Some(mouse) = self.gadgets.mouse() {
                if let Err(e) = mouse.release_all() {
                    warn!("failed to release mouse buttons on pause: {e}");
                }
            }
            self.activation.clear();
            info!("relaying paused by shortcut");
        } else {
            self.activation.set();
            info!("relaying resumed by shortcut");
            debug!("events will flow again on the next device read");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HidConfig;
    use crate::gadget::{GadgetSet, KeyGadget};
    use evdev::Key;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingKeys {
        release_all_calls: AtomicU32,
    }

    impl CountingKeys {
        fn new() -> Self {
            Self {
                release_all_calls: AtomicU32::new(0),
            }
        }
    }

    impl KeyGadget for CountingKeys {
        fn press(&self, _usage: u16) -> crate::error::Result<()> {
            Ok(())
        }
        fn release(&self, _usage: u16) -> crate::error::Result<()> {
            Ok(())
        }
        fn release_all(&self) -> crate::error::Result<()> {
            self.release_all_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn toggler(keys: &[&str]) -> (ShortcutToggler, Arc<ActivationFlag>, Arc<CountingKeys>) {
        let activation = Arc::new(ActivationFlag::new(true));
        let gadgets = Arc::new(GadgetManager::new(HidConfig::default()));
        let counting = Arc::new(CountingKeys::new());
        gadgets.replace(GadgetSet {
            keyboard: Some(counting.clone()),
            mouse: None,
            consumer: None,
        });
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        (
            ShortcutToggler::new(&keys, activation.clone(), gadgets),
            activation,
            counting,
        )
    }

    fn press(key: Key) -> KeyPress {
        KeyPress {
            key,
            state: KeyState::Down,
        }
    }

    fn release(key: Key) -> KeyPress {
        KeyPress {
            key,
            state: KeyState::Up,
        }
    }

    #[test]
    fn partial_combination_does_not_toggle() {
        let (toggler, activation, _) = toggler(&["LEFTCTRL", "RIGHTALT"]);
        assert!(!toggler.handle_key_event(&press(Key::KEY_LEFTCTRL)));
        assert!(activation.is_active());
    }

    #[test]
    fn full_combination_toggles_in_either_order() {
        let (toggler, activation, _) = toggler(&["LEFTCTRL", "RIGHTALT"]);

        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        assert!(toggler.handle_key_event(&press(Key::KEY_RIGHTALT)));
        assert!(!activation.is_active());

        toggler.handle_key_event(&release(Key::KEY_LEFTCTRL));
        toggler.handle_key_event(&release(Key::KEY_RIGHTALT));

        toggler.handle_key_event(&press(Key::KEY_RIGHTALT));
        assert!(toggler.handle_key_event(&press(Key::KEY_LEFTCTRL)));
        assert!(activation.is_active());
    }

    #[test]
    fn holding_keys_toggles_only_once() {
        let (toggler, activation, _) = toggler(&["LEFTCTRL", "RIGHTALT"]);

        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        assert!(toggler.handle_key_event(&press(Key::KEY_RIGHTALT)));
        assert!(!activation.is_active());

        // second press of one key while the other stayed "held" after the
        // toggle cleared the tracking set: no re-toggle without both again
        assert!(!toggler.handle_key_event(&press(Key::KEY_RIGHTALT)));
        assert!(!activation.is_active());
    }

    #[test]
    fn repeat_events_are_ignored() {
        let (toggler, activation, _) = toggler(&["LEFTCTRL", "RIGHTALT"]);
        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        let repeat = KeyPress {
            key: Key::KEY_RIGHTALT,
            state: KeyState::Repeat,
        };
        assert!(!toggler.handle_key_event(&repeat));
        assert!(activation.is_active());
    }

    #[test]
    fn pausing_releases_held_keys() {
        let (toggler, activation, counting) = toggler(&["LEFTCTRL", "RIGHTALT"]);
        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        toggler.handle_key_event(&press(Key::KEY_RIGHTALT));
        assert!(!activation.is_active());
        assert_eq!(counting.release_all_calls.load(Ordering::SeqCst), 1);

        // resuming does not release again
        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        toggler.handle_key_event(&press(Key::KEY_RIGHTALT));
        assert!(activation.is_active());
        assert_eq!(counting.release_all_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn key_names_accept_prefixed_and_mixed_case_forms() {
        let (toggler, activation, _) = toggler(&["key_leftctrl", "RightAlt"]);
        toggler.handle_key_event(&press(Key::KEY_LEFTCTRL));
        assert!(toggler.handle_key_event(&press(Key::KEY_RIGHTALT)));
        assert!(!activation.is_active());
    }

    #[test]
    fn empty_shortcut_never_toggles() {
        let (toggler, activation, _) = toggler(&[]);
        assert!(!toggler.is_configured());
        assert!(!toggler.handle_key_event(&press(Key::KEY_LEFTCTRL)));
        assert!(activation.is_active());
    }
}
