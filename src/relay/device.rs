//! Per-device relay worker
//!
//! One [`DeviceRelay`] pumps a single evdev device: it reads events off the
//! async stream, runs the trigger and shortcut hooks, and forwards whatever
//! survives the activation gate to the gadget endpoints. A busy gadget write
//! is retried a bounded number of times and then the event is dropped; the
//! relay never queues input.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use evdev::Device;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{AppError, Result};
use crate::gadget::GadgetManager;
use crate::relay::mover::{MouseMover, TapTracker};
use crate::relay::shortcut::ShortcutToggler;
use crate::relay::ActivationFlag;
use crate::translate::{
    self, classify, KeyPress, KeyState, MouseMotion, RelayedEvent,
};

/// Why an event was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The gadget stayed busy through every retry
    Busy,
    /// The USB link went down mid-write
    LinkDown,
    /// Any other write failure
    Error,
}

/// Result of one dispatch attempt, retries included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Dropped(DropReason),
}

/// Forward one classified event to the matching gadget endpoint.
pub fn dispatch(gadgets: &GadgetManager, event: &RelayedEvent) -> Result<()> {
    match event {
        RelayedEvent::Motion(MouseMotion { dx, dy, wheel }) => {
            let mouse = gadgets
                .mouse()
                .ok_or(AppError::GadgetMissing { gadget: "mouse" })?;
            mouse.move_rel(*dx, *dy, *wheel)
        }
        RelayedEvent::Key(KeyPress { key, state }) => {
            // the host applies its own repeat rate to held keys
            if *state == KeyState::Repeat {
                return Ok(());
            }
            let down = *state == KeyState::Down;

            if let Some(bit) = translate::mouse_button_bit(*key) {
                let mouse = gadgets
                    .mouse()
                    .ok_or(AppError::GadgetMissing { gadget: "mouse" })?;
                return if down {
                    mouse.press(bit)
                } else {
                    mouse.release(bit)
                };
            }
            if let Some(usage) = translate::consumer_usage(*key) {
                let consumer = gadgets
                    .consumer()
                    .ok_or(AppError::GadgetMissing { gadget: "consumer" })?;
                return if down {
                    consumer.press(usage)
                } else {
                    consumer.release(usage)
                };
            }
            if let Some(usage) = translate::keyboard_usage(*key) {
                let keyboard = gadgets
                    .keyboard()
                    .ok_or(AppError::GadgetMissing { gadget: "keyboard" })?;
                return if down {
                    keyboard.press(u16::from(usage))
                } else {
                    keyboard.release(u16::from(usage))
                };
            }
            trace!("no HID mapping for {:?}, skipping", key);
            Ok(())
        }
    }
}

/// Dispatch with bounded retries for busy gadgets. Link-down failures clear
/// the activation flag so the rest of the pipeline stops trying too.
pub async fn dispatch_with_retry(
    gadgets: &GadgetManager,
    activation: &ActivationFlag,
    event: &RelayedEvent,
    max_tries: u32,
    retry_delay: Duration,
) -> DispatchOutcome {
    let max_tries = max_tries.max(1);
    for attempt in 1..=max_tries {
        match dispatch(gadgets, event) {
            Ok(()) => return DispatchOutcome::Delivered,
            Err(e) if e.is_busy() => {
                if attempt == max_tries {
                    warn!("gadget still busy after {max_tries} attempts, dropping event");
                    return DispatchOutcome::Dropped(DropReason::Busy);
                }
                trace!("gadget busy (attempt {attempt}/{max_tries}), retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) if e.is_link_down() => {
                warn!("USB link down during write, suspending relay: {e}");
                activation.clear();
                return DispatchOutcome::Dropped(DropReason::LinkDown);
            }
            Err(e) => {
                error!("gadget write failed, dropping event: {e}");
                return DispatchOutcome::Dropped(DropReason::Error);
            }
        }
    }
    DispatchOutcome::Dropped(DropReason::Busy)
}

/// Settings one relay worker needs, pulled off the shared config
#[derive(Clone)]
pub struct WorkerSettings {
    pub grab: bool,
    pub max_tries: u32,
    pub retry_delay: Duration,
    pub trigger_keys: HashSet<String>,
    pub trigger_taps: usize,
    pub trigger_window: Duration,
}

/// Relays one input device until cancelled or the device goes away
pub struct DeviceRelay {
    path: PathBuf,
    name: String,
    gadgets: Arc<GadgetManager>,
    activation: Arc<ActivationFlag>,
    shortcut: Arc<ShortcutToggler>,
    mover: Arc<MouseMover>,
    settings: WorkerSettings,
    taps: TapTracker,
    grabbed: bool,
}

impl DeviceRelay {
    pub fn new(
        path: PathBuf,
        name: String,
        gadgets: Arc<GadgetManager>,
        activation: Arc<ActivationFlag>,
        shortcut: Arc<ShortcutToggler>,
        mover: Arc<MouseMover>,
        settings: WorkerSettings,
    ) -> Self {
        let taps = TapTracker::new(settings.trigger_taps, settings.trigger_window);
        Self {
            path,
            name,
            gadgets,
            activation,
            shortcut,
            mover,
            settings,
            taps,
            grabbed: false,
        }
    }

    /// Pump events until the token is cancelled or the device disappears.
    pub async fn run(mut self, device: Device, cancel: CancellationToken) -> Result<()> {
        let mut stream = device.into_event_stream().map_err(AppError::Io)?;
        info!("relaying {} ({})", self.name, self.path.display());

        if self.settings.grab {
            self.set_grab(stream.device_mut(), true);
        }

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("worker for {} cancelled", self.path.display());
                    break Ok(());
                }
                event = stream.next_event() => {
                    match event {
                        Ok(event) => {
                            self.handle_event(&mut stream, &event).await;
                        }
                        Err(e) => {
                            break Err(AppError::DeviceLost(format!(
                                "{} ({}): {e}",
                                self.name,
                                self.path.display()
                            )));
                        }
                    }
                }
            }
        };

        if self.grabbed {
            self.set_grab(stream.device_mut(), false);
        }
        self.mover.stop().await;
        result
    }

    async fn handle_event(
        &mut self,
        stream: &mut evdev::EventStream,
        raw: &evdev::InputEvent,
    ) {
        // keep the grab in step with the activation flag so a paused relay
        // hands the device back to the local session
        if self.settings.grab {
            let want = self.activation.is_active();
            if want != self.grabbed {
                self.set_grab(stream.device_mut(), want);
            }
        }

        let Some(event) = classify(raw) else {
            return;
        };

        if let RelayedEvent::Key(press) = &event {
            if press.state == KeyState::Down && self.is_trigger_key(press) {
                if self.taps.record(Instant::now()) {
                    info!("trigger taps detected on {}, toggling mover", self.name);
                    self.mover.toggle().await;
                    return;
                }
            }
            if self.shortcut.handle_key_event(press) {
                // the completing keystroke is consumed by the toggle
                return;
            }
        }

        if !self.activation.is_active() {
            trace!("relay inactive, dropping event from {}", self.name);
            return;
        }

        dispatch_with_retry(
            &self.gadgets,
            &self.activation,
            &event,
            self.settings.max_tries,
            self.settings.retry_delay,
        )
        .await;
    }

    fn is_trigger_key(&self, press: &KeyPress) -> bool {
        if self.settings.trigger_keys.is_empty() {
            return false;
        }
        let name = translate::key_name(press.key);
        let name = name.strip_prefix("KEY_").unwrap_or(&name);
        self.settings.trigger_keys.contains(name)
    }

    fn set_grab(&mut self, device: &mut Device, grab: bool) {
        let result = if grab { device.grab() } else { device.ungrab() };
        match result {
            Ok(()) => {
                self.grabbed = grab;
                debug!(
                    "{} {}",
                    if grab { "grabbed" } else { "released" },
                    self.path.display()
                );
            }
            Err(e) => warn!(
                "failed to {} {}: {e}",
                if grab { "grab" } else { "ungrab" },
                self.path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HidConfig;
    use crate::gadget::{GadgetSet, KeyGadget, PointerGadget};
    use evdev::Key;
    use parking_lot::Mutex;
    use std::io;

    /// Pointer gadget scripted to fail a fixed number of times per call kind
    struct ScriptedMouse {
        failures: Mutex<Vec<AppError>>,
        moves: Mutex<Vec<(i32, i32, i32)>>,
    }

    impl ScriptedMouse {
        fn new(failures: Vec<AppError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                moves: Mutex::new(Vec::new()),
            }
        }

        fn next(&self) -> Result<()> {
            let mut failures = self.failures.lock();
            if failures.is_empty() {
                Ok(())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    impl PointerGadget for ScriptedMouse {
        fn move_rel(&self, dx: i32, dy: i32, wheel: i32) -> Result<()> {
            self.next()?;
            self.moves.lock().push((dx, dy, wheel));
            Ok(())
        }
        fn press(&self, _button: u8) -> Result<()> {
            self.next()
        }
        fn release(&self, _button: u8) -> Result<()> {
            self.next()
        }
        fn release_all(&self) -> Result<()> {
            Ok(())
        }
    }

    struct RecordingKeys {
        presses: Mutex<Vec<u16>>,
        releases: Mutex<Vec<u16>>,
    }

    impl RecordingKeys {
        fn new() -> Self {
            Self {
                presses: Mutex::new(Vec::new()),
                releases: Mutex::new(Vec::new()),
            }
        }
    }

    impl KeyGadget for RecordingKeys {
        fn press(&self, usage: u16) -> Result<()> {
            self.presses.lock().push(usage);
            Ok(())
        }
        fn release(&self, usage: u16) -> Result<()> {
            self.releases.lock().push(usage);
            Ok(())
        }
        fn release_all(&self) -> Result<()> {
            Ok(())
        }
    }

    fn manager_with_mouse(mouse: Arc<ScriptedMouse>) -> GadgetManager {
        let manager = GadgetManager::new(HidConfig::default());
        manager.replace(GadgetSet {
            keyboard: None,
            mouse: Some(mouse),
            consumer: None,
        });
        manager
    }

    fn busy() -> AppError {
        AppError::HidBusy { gadget: "mouse" }
    }

    fn motion() -> RelayedEvent {
        RelayedEvent::Motion(MouseMotion {
            dx: 1,
            dy: 0,
            wheel: 0,
        })
    }

    #[tokio::test]
    async fn busy_writes_are_retried_until_delivered() {
        let mouse = Arc::new(ScriptedMouse::new(vec![busy(), busy()]));
        let manager = manager_with_mouse(mouse.clone());
        let activation = ActivationFlag::new(true);

        let outcome = dispatch_with_retry(
            &manager,
            &activation,
            &motion(),
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(outcome, DispatchOutcome::Delivered);
        assert_eq!(mouse.moves.lock().len(), 1);
        assert!(activation.is_active());
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_event() {
        let mouse = Arc::new(ScriptedMouse::new(vec![busy(), busy(), busy()]));
        let manager = manager_with_mouse(mouse.clone());
        let activation = ActivationFlag::new(true);

        let outcome = dispatch_with_retry(
            &manager,
            &activation,
            &motion(),
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::Busy));
        assert!(mouse.moves.lock().is_empty());
        // backpressure does not pause the relay
        assert!(activation.is_active());
    }

    #[tokio::test]
    async fn link_down_suspends_the_relay() {
        let mouse = Arc::new(ScriptedMouse::new(vec![AppError::HidLinkDown {
            gadget: "mouse",
            reason: io::Error::from_raw_os_error(libc::ESHUTDOWN).to_string(),
        }]));
        let manager = manager_with_mouse(mouse);
        let activation = ActivationFlag::new(true);

        let outcome = dispatch_with_retry(
            &manager,
            &activation,
            &motion(),
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::LinkDown));
        assert!(!activation.is_active());
    }

    #[tokio::test]
    async fn missing_gadget_drops_without_retry() {
        let manager = GadgetManager::new(HidConfig::default());
        let activation = ActivationFlag::new(true);

        let outcome = dispatch_with_retry(
            &manager,
            &activation,
            &motion(),
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::Error));
    }

    #[test]
    fn keys_route_to_their_gadget() {
        let manager = GadgetManager::new(HidConfig::default());
        let keyboard = Arc::new(RecordingKeys::new());
        let consumer = Arc::new(RecordingKeys::new());
        manager.replace(GadgetSet {
            keyboard: Some(keyboard.clone()),
            mouse: None,
            consumer: Some(consumer.clone()),
        });

        let key_down = RelayedEvent::Key(KeyPress {
            key: Key::KEY_A,
            state: KeyState::Down,
        });
        dispatch(&manager, &key_down).unwrap();
        assert_eq!(keyboard.presses.lock().as_slice(), &[0x04]);

        let volume_up = RelayedEvent::Key(KeyPress {
            key: Key::KEY_VOLUMEUP,
            state: KeyState::Down,
        });
        dispatch(&manager, &volume_up).unwrap();
        assert_eq!(consumer.presses.lock().as_slice(), &[0x00E9]);

        let volume_release = RelayedEvent::Key(KeyPress {
            key: Key::KEY_VOLUMEUP,
            state: KeyState::Up,
        });
        dispatch(&manager, &volume_release).unwrap();
        assert_eq!(consumer.releases.lock().as_slice(), &[0x00E9]);
    }

    #[test]
    fn repeats_and_unmapped_keys_are_noops() {
        let manager = GadgetManager::new(HidConfig::default());

        let repeat = RelayedEvent::Key(KeyPress {
            key: Key::KEY_A,
            state: KeyState::Repeat,
        });
        // no gadgets installed: a repeat still succeeds because it never writes
        dispatch(&manager, &repeat).unwrap();

        let unmapped = RelayedEvent::Key(KeyPress {
            key: Key::KEY_MICMUTE,
            state: KeyState::Down,
        });
        dispatch(&manager, &unmapped).unwrap();
    }
}
