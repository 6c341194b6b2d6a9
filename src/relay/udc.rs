//! UDC state monitoring
//!
//! Polls the UDC state file under `/sys/class/udc/` and drives the shared
//! activation flag from it: relaying is only allowed while the controller
//! reports `configured`. Transitions are edge-triggered so the flag is not
//! hammered every poll tick.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::relay::ActivationFlag;

const STATE_CONFIGURED: &str = "configured";
const STATE_NOT_ATTACHED: &str = "not_attached";

/// Polls the UDC state file and gates relaying on the USB link state
pub struct UdcStateMonitor {
    activation: Arc<ActivationFlag>,
    state_path: PathBuf,
    poll_interval: Duration,
    last_state: Option<String>,
}

impl UdcStateMonitor {
    pub fn new(activation: Arc<ActivationFlag>, state_path: PathBuf, poll_interval: Duration) -> Self {
        if !state_path.exists() {
            warn!(
                "UDC state file {} not found, treating the link as detached until it appears",
                state_path.display()
            );
        }
        Self {
            activation,
            state_path,
            poll_interval,
            last_state: None,
        }
    }

    fn read_state(&self) -> String {
        match std::fs::read_to_string(&self.state_path) {
            Ok(raw) => raw.trim().to_string(),
            Err(_) => STATE_NOT_ATTACHED.to_string(),
        }
    }

    /// One poll step. Returns true when the state changed since the last poll.
    pub fn poll_once(&mut self) -> bool {
        let state = self.read_state();
        if self.last_state.as_deref() == Some(state.as_str()) {
            return false;
        }

        debug!("UDC state changed to {state:?}");
        if state == STATE_CONFIGURED {
            self.activation.set();
            info!("USB link configured, relaying enabled");
        } else {
            self.activation.clear();
            info!("USB link state {state:?}, relaying suspended");
        }
        self.last_state = Some(state);
        true
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("UDC monitor stopping");
                    return;
                }
                _ = interval.tick() => {
                    self.poll_once();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn monitor(path: PathBuf) -> (UdcStateMonitor, Arc<ActivationFlag>) {
        let activation = Arc::new(ActivationFlag::new(true));
        (
            UdcStateMonitor::new(activation.clone(), path, Duration::from_millis(500)),
            activation,
        )
    }

    #[test]
    fn missing_file_reads_as_not_attached() {
        let (mut mon, activation) = monitor(PathBuf::from("/nonexistent/udc/state"));
        assert!(mon.poll_once());
        assert!(!activation.is_active());
        // no further edge while the file stays missing
        assert!(!mon.poll_once());
    }

    #[test]
    fn transitions_are_edge_triggered() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state");

        std::fs::write(&state_path, "not attached\n").unwrap();
        let (mut mon, activation) = monitor(state_path.clone());

        assert!(mon.poll_once());
        assert!(!activation.is_active());
        assert!(!mon.poll_once());

        std::fs::write(&state_path, "configured\n").unwrap();
        assert!(mon.poll_once());
        assert!(activation.is_active());
        assert!(!mon.poll_once());

        std::fs::write(&state_path, "default\n").unwrap();
        assert!(mon.poll_once());
        assert!(!activation.is_active());
    }

    #[test]
    fn state_value_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state");
        let mut file = std::fs::File::create(&state_path).unwrap();
        writeln!(file, "configured").unwrap();

        let (mut mon, activation) = monitor(state_path);
        activation.clear();
        assert!(mon.poll_once());
        assert!(activation.is_active());
    }
}
