//! Application configuration
//!
//! Loaded from an optional JSON file, with CLI overrides applied on top.
//! Every section carries serde defaults so a partial (or absent) file
//! always yields a usable configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Relay behavior (device selection, activation, retry policy)
    pub relay: RelayConfig,
    /// HID gadget device paths
    pub hid: HidConfig,
    /// Anti-idle mouse mover settings
    pub mover: MoverConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from the given path if set, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Relay behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Device selectors: event node path, MAC address, or name fragment
    pub devices: Vec<String>,
    /// Relay every input device except those skipped by name prefix
    pub auto_discover: bool,
    /// Device name prefixes skipped during auto-discovery
    pub skip_name_prefixes: Vec<String>,
    /// Grab devices for exclusive access while relaying is active
    pub grab_devices: bool,
    /// Key names that together toggle relaying (e.g. ["LEFTCTRL", "RIGHTALT"])
    pub shortcut_keys: Vec<String>,
    /// UDC state file reporting the USB link state
    pub udc_state_path: PathBuf,
    /// UDC state poll interval in milliseconds
    pub udc_poll_interval_ms: u64,
    /// Maximum attempts for a blocked HID write
    pub write_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub write_retry_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            auto_discover: false,
            // vc4-hdmi is the HDMI-CEC pseudo-device on Raspberry Pi boards
            skip_name_prefixes: vec!["vc4-hdmi".to_string()],
            grab_devices: false,
            shortcut_keys: Vec::new(),
            udc_state_path: PathBuf::from("/sys/class/udc/20980000.usb/state"),
            udc_poll_interval_ms: 500,
            write_retries: 3,
            write_retry_delay_ms: 100,
        }
    }
}

/// HID gadget device paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HidConfig {
    /// Keyboard gadget device path
    pub keyboard: PathBuf,
    /// Relative mouse gadget device path
    pub mouse: PathBuf,
    /// Consumer control gadget device path
    pub consumer: PathBuf,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            keyboard: PathBuf::from("/dev/hidg0"),
            mouse: PathBuf::from("/dev/hidg1"),
            consumer: PathBuf::from("/dev/hidg2"),
        }
    }
}

/// Anti-idle mouse mover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverConfig {
    /// Pattern name: "circle", "zigzag", "square", "mix", or "random"
    pub default_pattern: String,
    /// How often the random mode reselects a pattern, in seconds
    pub random_pattern_change_interval_secs: u64,
    /// Keys whose taps trigger the mover toggle
    pub trigger_keys: Vec<String>,
    /// Number of taps required within the window
    pub trigger_taps: usize,
    /// Tap detection window in milliseconds
    pub trigger_window_ms: u64,
    /// Consecutive write failures before the mover stops itself
    pub max_consecutive_errors: u32,
    pub circle: CirclePattern,
    pub zigzag: ZigzagPattern,
    pub square: SquarePattern,
    pub mix: MixPattern,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            default_pattern: "random".to_string(),
            random_pattern_change_interval_secs: 20,
            trigger_keys: vec!["LEFTCTRL".to_string(), "RIGHTCTRL".to_string()],
            trigger_taps: 5,
            trigger_window_ms: 3000,
            max_consecutive_errors: 5,
            circle: CirclePattern::default(),
            zigzag: ZigzagPattern::default(),
            square: SquarePattern::default(),
            mix: MixPattern::default(),
        }
    }
}

/// Circle pattern parameters; two-element ranges are resolved per cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CirclePattern {
    pub radius: [f64; 2],
    pub steps: [u32; 2],
    pub delay_ms: u64,
}

impl Default for CirclePattern {
    fn default() -> Self {
        Self {
            radius: [5.0, 20.0],
            steps: [20, 50],
            delay_ms: 50,
        }
    }
}

/// Zigzag pattern parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigzagPattern {
    pub width: [f64; 2],
    pub height: [f64; 2],
    pub steps: [u32; 2],
    pub delay_ms: u64,
}

impl Default for ZigzagPattern {
    fn default() -> Self {
        Self {
            width: [10.0, 30.0],
            height: [5.0, 15.0],
            steps: [30, 60],
            delay_ms: 50,
        }
    }
}

/// Square pattern parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquarePattern {
    pub size: [f64; 2],
    pub steps: [u32; 2],
    pub delay_ms: u64,
}

impl Default for SquarePattern {
    fn default() -> Self {
        Self {
            size: [10.0, 25.0],
            steps: [30, 60],
            delay_ms: 50,
        }
    }
}

/// Mix pattern: time-sliced rotation through circle, zigzag, square
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixPattern {
    pub duration_per_pattern_secs: u64,
    pub delay_ms: u64,
}

impl Default for MixPattern {
    fn default() -> Self {
        Self {
            duration_per_pattern_secs: 10,
            delay_ms: 50,
        }
    }
}
