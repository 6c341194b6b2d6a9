//! Forward Linux input devices to a USB HID gadget.
//!
//! The relay reads keyboard, mouse, and multimedia events from evdev devices
//! and replays them as boot-protocol HID reports through the configfs gadget
//! device files, so the box running it acts as a composite USB keyboard and
//! mouse toward the attached host. Devices are selected by event node path,
//! Bluetooth address, or name fragment, hotplug is handled via udev, and
//! relaying is gated on the USB link state reported by the UDC.

pub mod config;
pub mod error;
pub mod gadget;
pub mod hotplug;
pub mod relay;
pub mod translate;

pub use error::{AppError, Result};
