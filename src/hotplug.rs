//! Input device hotplug
//!
//! Listens on a udev monitor socket filtered to the `input` subsystem and
//! feeds add/remove notifications for `/dev/input/event*` nodes into the
//! relay controller.

use std::sync::Arc;

use futures::StreamExt;
use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::relay::controller::RelayController;

/// Bridges udev input-subsystem events to the relay controller
pub struct UdevEventMonitor {
    controller: Arc<RelayController>,
}

impl UdevEventMonitor {
    pub fn new(controller: Arc<RelayController>) -> Self {
        Self { controller }
    }

    /// Listen for hotplug events until cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let monitor = MonitorBuilder::new()
            .map_err(AppError::Io)?
            .match_subsystem("input")
            .map_err(AppError::Io)?
            .listen()
            .map_err(AppError::Io)?;
        let mut socket = AsyncMonitorSocket::new(monitor).map_err(AppError::Io)?;
        info!("watching udev for input device hotplug");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("hotplug monitor stopping");
                    return Ok(());
                }
                event = socket.next() => {
                    match event {
                        Some(Ok(event)) => self.handle_event(&event),
                        Some(Err(e)) => warn!("udev monitor read failed: {e}"),
                        None => {
                            return Err(AppError::Internal(
                                "udev monitor socket closed".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    fn handle_event(&self, event: &tokio_udev::Event) {
        // only event nodes are relayable; js*/mouse*/mice aliases are not
        let Some(devnode) = event.devnode() else {
            return;
        };
        if !devnode
            .to_string_lossy()
            .starts_with("/dev/input/event")
        {
            return;
        }

        match event.event_type() {
            EventType::Add => {
                debug!("udev add: {}", devnode.display());
                self.controller.add_device(devnode, None);
            }
            EventType::Remove => {
                debug!("udev remove: {}", devnode.display());
                self.controller.remove_device(devnode);
            }
            _ => {}
        }
    }
}
