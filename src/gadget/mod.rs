//! USB HID gadget management
//!
//! The [`GadgetManager`] owns the set of emulated HID endpoints presented to
//! the host. The whole set is replaced atomically by `enable_gadgets()`; every
//! relay worker shares the manager and picks up the current handles on each
//! write. Before the first enable (or after a failed one) the getters return
//! `None` and callers are expected to suppress the action.

pub mod endpoint;
pub mod report;

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::config::HidConfig;
use crate::error::Result;
use endpoint::{ConsumerEndpoint, KeyboardEndpoint, MouseEndpoint};

/// Key-style gadget surface (keyboard and consumer control)
pub trait KeyGadget: Send + Sync {
    fn press(&self, usage: u16) -> Result<()>;
    fn release(&self, usage: u16) -> Result<()>;
    fn release_all(&self) -> Result<()>;
}

/// Pointer gadget surface (relative mouse)
pub trait PointerGadget: Send + Sync {
    fn move_rel(&self, dx: i32, dy: i32, wheel: i32) -> Result<()>;
    fn press(&self, button: u8) -> Result<()>;
    fn release(&self, button: u8) -> Result<()>;
    fn release_all(&self) -> Result<()>;
}

/// The three gadget handles, replaced together and never partially
#[derive(Clone, Default)]
pub struct GadgetSet {
    pub keyboard: Option<Arc<dyn KeyGadget>>,
    pub mouse: Option<Arc<dyn PointerGadget>>,
    pub consumer: Option<Arc<dyn KeyGadget>>,
}

/// Owns the lifecycle of the emulated HID endpoints
pub struct GadgetManager {
    cfg: HidConfig,
    set: ArcSwap<GadgetSet>,
}

impl GadgetManager {
    /// Create without enabling devices. Call [`enable_gadgets`](Self::enable_gadgets)
    /// to open them.
    pub fn new(cfg: HidConfig) -> Self {
        Self {
            cfg,
            set: ArcSwap::from_pointee(GadgetSet::default()),
        }
    }

    /// Disable and re-open the gadget device files, then publish the new
    /// keyboard/mouse/consumer handles as one atomic replacement.
    pub fn enable_gadgets(&self) -> Result<()> {
        // Best-effort disable: dropping the old set closes the device files.
        self.set.store(Arc::new(GadgetSet::default()));
        debug!("gadget handles dropped before re-enable");

        let keyboard = KeyboardEndpoint::open(&self.cfg.keyboard)?;
        let mouse = MouseEndpoint::open(&self.cfg.mouse)?;
        let consumer = ConsumerEndpoint::open(&self.cfg.consumer)?;

        self.replace(GadgetSet {
            keyboard: Some(Arc::new(keyboard)),
            mouse: Some(Arc::new(mouse)),
            consumer: Some(Arc::new(consumer)),
        });
        info!(
            "HID gadgets enabled: {}, {}, {}",
            self.cfg.keyboard.display(),
            self.cfg.mouse.display(),
            self.cfg.consumer.display()
        );
        Ok(())
    }

    /// Publish a new gadget set. Also the injection point for test doubles.
    pub fn replace(&self, set: GadgetSet) {
        self.set.store(Arc::new(set));
    }

    pub fn keyboard(&self) -> Option<Arc<dyn KeyGadget>> {
        self.set.load().keyboard.clone()
    }

    pub fn mouse(&self) -> Option<Arc<dyn PointerGadget>> {
        self.set.load().mouse.clone()
    }

    pub fn consumer(&self) -> Option<Arc<dyn KeyGadget>> {
        self.set.load().consumer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HidConfig;

    struct NullKeys;
    impl KeyGadget for NullKeys {
        fn press(&self, _usage: u16) -> Result<()> {
            Ok(())
        }
        fn release(&self, _usage: u16) -> Result<()> {
            Ok(())
        }
        fn release_all(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handles_absent_before_enable() {
        let manager = GadgetManager::new(HidConfig::default());
        assert!(manager.keyboard().is_none());
        assert!(manager.mouse().is_none());
        assert!(manager.consumer().is_none());
    }

    #[test]
    fn replace_publishes_all_handles_together() {
        let manager = GadgetManager::new(HidConfig::default());
        manager.replace(GadgetSet {
            keyboard: Some(Arc::new(NullKeys)),
            mouse: None,
            consumer: Some(Arc::new(NullKeys)),
        });
        assert!(manager.keyboard().is_some());
        assert!(manager.mouse().is_none());
        assert!(manager.consumer().is_some());

        manager.replace(GadgetSet::default());
        assert!(manager.keyboard().is_none());
        assert!(manager.consumer().is_none());
    }
}
