//! Device selection
//!
//! Users identify devices three ways: the event node path, the Bluetooth MAC
//! address (matched against the device's uniq string), or a case-insensitive
//! name fragment. MAC addresses accept `:` or `-` separators in any case and
//! are normalized to lowercase colon form before comparison.

use std::fmt;
use std::path::Path;

/// One parsed device selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Event node path, e.g. `/dev/input/event3`
    Path(String),
    /// Normalized MAC address, e.g. `aa:bb:cc:dd:ee:ff`
    Address(String),
    /// Lowercased substring of the device name
    Name(String),
}

impl DeviceSelector {
    /// Classify a raw selector string.
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with("/dev/input/event") {
            return DeviceSelector::Path(raw.to_string());
        }
        if let Some(mac) = normalize_mac(raw) {
            return DeviceSelector::Address(mac);
        }
        DeviceSelector::Name(raw.to_lowercase())
    }

    /// Check this selector against a device's path, name, and uniq string.
    pub fn matches(&self, path: &Path, name: &str, uniq: &str) -> bool {
        match self {
            DeviceSelector::Path(p) => Path::new(p) == path,
            DeviceSelector::Address(mac) => {
                // an empty uniq never matches an address selector
                normalize_mac(uniq).is_some_and(|u| u == *mac)
            }
            DeviceSelector::Name(fragment) => name.to_lowercase().contains(fragment.as_str()),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Path(p) => write!(f, "path {p}"),
            DeviceSelector::Address(a) => write!(f, "address {a}"),
            DeviceSelector::Name(n) => write!(f, "name ~ {n:?}"),
        }
    }
}

/// Normalize a MAC address to lowercase colon-separated form. Accepts `:` or
/// `-` separators; returns `None` for anything that is not six hex pairs.
pub fn normalize_mac(raw: &str) -> Option<String> {
    if raw.len() != 17 {
        return None;
    }
    let mut pairs = Vec::with_capacity(6);
    for part in raw.split(|c| c == ':' || c == '-') {
        if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        pairs.push(part.to_ascii_lowercase());
    }
    if pairs.len() != 6 {
        return None;
    }
    Some(pairs.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classify_picks_the_right_variant() {
        assert_eq!(
            DeviceSelector::classify("/dev/input/event3"),
            DeviceSelector::Path("/dev/input/event3".into())
        );
        assert_eq!(
            DeviceSelector::classify("AA:BB:CC:DD:EE:FF"),
            DeviceSelector::Address("aa:bb:cc:dd:ee:ff".into())
        );
        assert_eq!(
            DeviceSelector::classify("aa-bb-cc-dd-ee-ff"),
            DeviceSelector::Address("aa:bb:cc:dd:ee:ff".into())
        );
        assert_eq!(
            DeviceSelector::classify("Logitech K400"),
            DeviceSelector::Name("logitech k400".into())
        );
        // 17 chars but not hex pairs
        assert_eq!(
            DeviceSelector::classify("seventeen-chars!!"),
            DeviceSelector::Name("seventeen-chars!!".into())
        );
    }

    #[test]
    fn address_matching_normalizes_both_sides() {
        let sel = DeviceSelector::classify("AA:BB:CC:DD:EE:FF");
        let path = PathBuf::from("/dev/input/event5");
        assert!(sel.matches(&path, "BT Keyboard", "aa-bb-cc-dd-ee-ff"));
        assert!(sel.matches(&path, "BT Keyboard", "AA:BB:CC:DD:EE:FF"));
        assert!(!sel.matches(&path, "BT Keyboard", "11:22:33:44:55:66"));
        assert!(!sel.matches(&path, "BT Keyboard", ""));
    }

    #[test]
    fn path_and_name_matching() {
        let path_sel = DeviceSelector::classify("/dev/input/event3");
        assert!(path_sel.matches(Path::new("/dev/input/event3"), "x", ""));
        assert!(!path_sel.matches(Path::new("/dev/input/event4"), "x", ""));

        let name_sel = DeviceSelector::classify("K400");
        assert!(name_sel.matches(Path::new("/dev/input/event9"), "Logitech K400 Plus", ""));
        // name matching is case-insensitive
        assert!(name_sel.matches(Path::new("/dev/input/event9"), "logitech k400 plus", ""));
        assert!(!name_sel.matches(Path::new("/dev/input/event9"), "Logitech M720", ""));
    }

    #[test]
    fn mac_normalization_rejects_malformed_input() {
        assert_eq!(normalize_mac("aa:bb:cc:dd:ee"), None);
        assert_eq!(normalize_mac("aa:bb:cc:dd:ee:ff:00"), None);
        assert_eq!(normalize_mac("gg:bb:cc:dd:ee:ff"), None);
        assert_eq!(normalize_mac("aabb:cc:dd:ee:ff0"), None);
        assert_eq!(normalize_mac(""), None);
    }
}
