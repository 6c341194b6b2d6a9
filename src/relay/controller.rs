//! Relay supervision
//!
//! The [`RelayController`] owns the worker pool: one task per relayed input
//! device, tracked by event node path. Devices come in from the startup scan
//! and from udev hotplug notifications; both paths go through the same
//! selection policy. Shutdown cancels every worker and waits for the pool to
//! drain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use evdev::Device;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::config::{MoverConfig, RelayConfig};
use crate::gadget::GadgetManager;
use crate::relay::device::{DeviceRelay, WorkerSettings};
use crate::relay::identifier::DeviceSelector;
use crate::relay::mover::MouseMover;
use crate::relay::shortcut::ShortcutToggler;
use crate::relay::ActivationFlag;
use crate::AppError;

/// Device selection and worker policy derived from [`RelayConfig`]
#[derive(Clone)]
pub struct RelaySettings {
    pub selectors: Vec<DeviceSelector>,
    pub auto_discover: bool,
    pub skip_name_prefixes: Vec<String>,
    pub worker: WorkerSettings,
}

impl RelaySettings {
    pub fn from_config(cfg: &RelayConfig, mover_cfg: &MoverConfig) -> Self {
        let selectors = cfg
            .devices
            .iter()
            .map(|raw| DeviceSelector::classify(raw))
            .collect();
        let trigger_keys = mover_cfg
            .trigger_keys
            .iter()
            .map(|k| {
                let upper = k.to_ascii_uppercase();
                upper
                    .strip_prefix("KEY_")
                    .map(str::to_string)
                    .unwrap_or(upper)
            })
            .collect();
        Self {
            selectors,
            auto_discover: cfg.auto_discover,
            skip_name_prefixes: cfg.skip_name_prefixes.clone(),
            worker: WorkerSettings {
                grab: cfg.grab_devices,
                max_tries: cfg.write_retries,
                retry_delay: Duration::from_millis(cfg.write_retry_delay_ms),
                trigger_keys,
                trigger_taps: mover_cfg.trigger_taps,
                trigger_window: Duration::from_millis(mover_cfg.trigger_window_ms),
            },
        }
    }
}

/// Decide whether a device should be relayed under the given policy.
pub fn selection_allows(
    settings: &RelaySettings,
    path: &Path,
    name: &str,
    uniq: &str,
) -> bool {
    if settings.auto_discover {
        let name = name.to_lowercase();
        return !settings
            .skip_name_prefixes
            .iter()
            .any(|prefix| name.starts_with(&prefix.to_lowercase()));
    }
    settings
        .selectors
        .iter()
        .any(|sel| sel.matches(path, name, uniq))
}

struct WorkerHandle {
    id: u64,
    cancel: CancellationToken,
}

/// Worker bookkeeping keyed by device path. Entries carry a generation id so
/// a retiring worker can only remove its own entry: a remove-then-add for the
/// same path must never let the old worker's unwind evict its successor.
struct WorkerTable {
    next_id: u64,
    entries: HashMap<PathBuf, WorkerHandle>,
}

impl WorkerTable {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Reserve the path for a new worker. `None` when already occupied.
    fn claim(&mut self, path: &Path, cancel: CancellationToken) -> Option<u64> {
        if self.entries.contains_key(path) {
            return None;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(path.to_path_buf(), WorkerHandle { id, cancel });
        Some(id)
    }

    /// Drop the entry for an externally removed device.
    fn release(&mut self, path: &Path) -> Option<CancellationToken> {
        self.entries.remove(path).map(|handle| handle.cancel)
    }

    /// Self-removal by a retiring worker; a stale generation is a no-op.
    fn retire(&mut self, path: &Path, id: u64) {
        if self.entries.get(path).is_some_and(|handle| handle.id == id) {
            self.entries.remove(path);
        }
    }

    fn drain(&mut self) -> Vec<CancellationToken> {
        self.entries
            .drain()
            .map(|(_, handle)| handle.cancel)
            .collect()
    }
}

/// Supervises one relay worker per selected input device
pub struct RelayController {
    gadgets: Arc<GadgetManager>,
    activation: Arc<ActivationFlag>,
    shortcut: Arc<ShortcutToggler>,
    mover_cfg: MoverConfig,
    settings: RelaySettings,
    workers: Arc<Mutex<WorkerTable>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl RelayController {
    pub fn new(
        gadgets: Arc<GadgetManager>,
        activation: Arc<ActivationFlag>,
        shortcut: Arc<ShortcutToggler>,
        mover_cfg: MoverConfig,
        settings: RelaySettings,
    ) -> Self {
        Self {
            gadgets,
            activation,
            shortcut,
            mover_cfg,
            settings,
            workers: Arc::new(Mutex::new(WorkerTable::new())),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the whole relay when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Scan existing devices, then run until shutdown and drain the pool.
    pub async fn run(self: &Arc<Self>) {
        for (path, device) in evdev::enumerate() {
            self.add_device(&path, Some(device));
        }
        if self.worker_count() == 0 {
            info!("no input devices matched at startup, waiting for hotplug");
        }

        self.shutdown.cancelled().await;
        info!("shutting down relay workers");

        let tokens = self.workers.lock().drain();
        for token in tokens {
            token.cancel();
        }
        self.tracker.close();
        self.tracker.wait().await;
        info!("relay stopped");
    }

    /// Consider a device for relaying. `device` carries the already-open
    /// handle from the startup scan; hotplug passes `None` and the node is
    /// opened here.
    pub fn add_device(self: &Arc<Self>, path: &Path, device: Option<Device>) {
        if self.workers.lock().contains(path) {
            debug!("{} already relayed", path.display());
            return;
        }
        if device.is_none() && !path.exists() {
            debug!("{} vanished before it could be opened", path.display());
            return;
        }

        let device = match device {
            Some(d) => d,
            // a node can disappear between the udev event and the open
            None => match Device::open(path) {
                Ok(d) => d,
                Err(e) => {
                    debug!("could not open {}: {e}", path.display());
                    return;
                }
            },
        };

        let name = device.name().unwrap_or("unknown").to_string();
        let uniq = device.unique_name().unwrap_or("").to_string();
        if !selection_allows(&self.settings, path, &name, &uniq) {
            debug!("{} ({name}) not selected for relaying", path.display());
            return;
        }

        if self.tracker.is_closed() {
            error!(
                "worker pool already closed, cannot relay {} ({name})",
                path.display()
            );
            return;
        }

        let cancel = self.shutdown.child_token();
        let Some(worker_id) = self.workers.lock().claim(path, cancel.clone()) else {
            debug!("{} claimed by another worker meanwhile", path.display());
            return;
        };

        // each worker gets its own mover so removing the device also ends
        // any anti-idle movement it started
        let mover = Arc::new(MouseMover::new(self.gadgets.clone(), self.mover_cfg.clone()));
        let relay = DeviceRelay::new(
            path.to_path_buf(),
            name.clone(),
            self.gadgets.clone(),
            self.activation.clone(),
            self.shortcut.clone(),
            mover,
            self.settings.worker.clone(),
        );
        let controller = self.clone();
        let worker_path = path.to_path_buf();
        self.tracker.spawn(async move {
            match relay.run(device, cancel).await {
                Ok(()) => {}
                Err(AppError::DeviceLost(detail)) => {
                    info!("device disconnected: {detail}");
                }
                Err(e) => {
                    error!("relay worker for {} failed: {e}", worker_path.display());
                }
            }
            controller.workers.lock().retire(&worker_path, worker_id);
        });
    }

    /// Stop relaying a removed device.
    pub fn remove_device(&self, path: &Path) {
        match self.workers.lock().release(path) {
            Some(cancel) => {
                info!("stopping relay for removed device {}", path.display());
                cancel.cancel();
            }
            None => debug!("{} removed but was not relayed", path.display()),
        }
    }
}
