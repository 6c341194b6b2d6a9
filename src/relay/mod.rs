//! Input relay core
//!
//! One [`controller::RelayController`] supervises a worker per input device.
//! Workers pump evdev events through the translate layer into the HID gadget
//! endpoints, gated by the shared [`ActivationFlag`].

pub mod controller;
pub mod device;
pub mod identifier;
pub mod mover;
pub mod shortcut;
pub mod udc;

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared relay on/off switch.
///
/// Set and cleared by the shortcut toggler and the UDC state monitor; read by
/// every relay worker before dispatching an event. Plain Acquire/Release is
/// enough since the flag carries no associated data.
#[derive(Debug)]
pub struct ActivationFlag(AtomicBool);

impl ActivationFlag {
    pub fn new(active: bool) -> Self {
        Self(AtomicBool::new(active))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
