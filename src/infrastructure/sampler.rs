//! The sampling loop.
//!
//! One iteration of the loop is one **tick**.  Per tick the sampler:
//!
//! 1. If no analogue device is owned: runs discovery, takes the first device
//!    found, and moves straight to the next tick (intentionally without
//!    touching the digital overlay or the change detector — no state is
//!    reported while no analogue device is present).
//! 2. Otherwise: reads the analogue sample set (may block briefly inside the
//!    HID layer), refreshes the digital overlay, merges the two into
//!    [`KeySample`]s, and feeds them to the change detector.
//! 3. Enqueues every payload the detector emitted onto the broadcast
//!    channel, in order.
//!
//! # Threading
//!
//! The loop runs on a dedicated OS thread because device reads may block and
//! must never stall the network event loop.  Payloads cross to the tokio
//! side through an unbounded FIFO `mpsc` channel: submission never blocks
//! the sampler, and delivery order equals submission order, which preserves
//! the release-before-snapshot ordering end-to-end.  (Same pattern as a raw
//! input hook thread feeding an async runtime through a channel.)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::application::detector::ChangeDetector;
use crate::domain::keys::KeySample;
use crate::infrastructure::device::{
    DeviceEnumerator, DeviceError, DeviceHandle, DigitalOverlay,
};

/// Drives the analogue/digital devices and emits snapshot payloads.
pub struct Sampler {
    handle: DeviceHandle,
    enumerator: Box<dyn DeviceEnumerator>,
    overlay: DigitalOverlay,
    detector: ChangeDetector,
    broadcast_tx: UnboundedSender<String>,
    reconnect_backoff: Duration,
}

impl Sampler {
    pub fn new(
        enumerator: Box<dyn DeviceEnumerator>,
        overlay: DigitalOverlay,
        broadcast_tx: UnboundedSender<String>,
        reconnect_backoff: Duration,
    ) -> Self {
        Self {
            handle: DeviceHandle::Disconnected,
            enumerator,
            overlay,
            detector: ChangeDetector::new(),
            broadcast_tx,
            reconnect_backoff,
        }
    }

    /// Whether an analogue device is currently owned.
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Runs exactly one tick.
    ///
    /// Exposed separately from [`run`](Self::run) so tests can single-step
    /// the loop with scripted devices.
    pub fn tick(&mut self) {
        let device = match &mut self.handle {
            DeviceHandle::Disconnected => {
                // Take the first device discovery finds; sampling starts on
                // the next tick.  The backoff keeps the retry off a full
                // core while nothing is plugged in.
                if let Some(device) = self.enumerator.discover().into_iter().next() {
                    info!("analogue keyboard connected");
                    self.handle = DeviceHandle::Connected(device);
                } else {
                    thread::sleep(self.reconnect_backoff);
                }
                return;
            }
            DeviceHandle::Connected(device) => device,
        };

        let analogue = match device.read_active_keys() {
            Ok(samples) => samples,
            Err(DeviceError::Disconnected) => {
                warn!("analogue keyboard disconnected; resuming discovery");
                self.handle = DeviceHandle::Disconnected;
                return;
            }
            Err(e) => {
                warn!("analogue read error: {e}");
                return;
            }
        };

        // The digital keyboard is refreshed every connected tick regardless
        // of whether the analogue state changed.
        self.overlay.update();

        let merged: Vec<KeySample> = analogue
            .iter()
            .map(|ak| KeySample::new(ak.key, ak.value, self.overlay.is_pressed(ak.key)))
            .collect();

        for payload in self.detector.observe(&merged) {
            debug!("enqueueing snapshot ({} bytes)", payload.len());
            if self.broadcast_tx.send(payload).is_err() {
                // Dispatcher is gone; the service is shutting down.
                return;
            }
        }
    }

    /// Runs ticks until `running` is cleared.
    pub fn run(mut self, running: Arc<AtomicBool>) {
        info!("sampling loop started");
        while running.load(Ordering::Relaxed) {
            self.tick();
        }
        info!("sampling loop stopped");
    }

    /// Spawns the loop on its own named OS thread.
    pub fn spawn(self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sampler".into())
            .spawn(move || self.run(running))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::keys::ActiveKey;
    use crate::infrastructure::device::mock::{
        MockDigitalSource, ScriptStep, ScriptedAnalogueKeyboard, ScriptedEnumerator,
    };
    use crate::infrastructure::device::NullDigitalSource;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

    /// Builds a sampler over a scripted device plus a handle to the digital
    /// pressed set and the broadcast receiver.
    fn make_sampler(
        script: Vec<ScriptStep>,
    ) -> (
        Sampler,
        std::sync::Arc<std::sync::Mutex<Vec<u16>>>,
        UnboundedReceiver<String>,
    ) {
        let (digital, pressed) = MockDigitalSource::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let sampler = Sampler::new(
            Box::new(ScriptedEnumerator::with_device(Box::new(
                ScriptedAnalogueKeyboard::new(script),
            ))),
            DigitalOverlay::new(Box::new(digital)),
            tx,
            Duration::from_millis(0),
        );
        (sampler, pressed, rx)
    }

    #[test]
    fn test_disconnected_ticks_are_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sampler = Sampler::new(
            Box::new(ScriptedEnumerator::empty()),
            DigitalOverlay::new(Box::new(NullDigitalSource)),
            tx,
            Duration::from_millis(0),
        );

        for _ in 0..5 {
            sampler.tick();
        }

        assert!(!sampler.is_connected());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_discovery_tick_emits_nothing() {
        let (mut sampler, _pressed, mut rx) =
            make_sampler(vec![Ok(vec![ActiveKey::new(4, 1.0)])]);

        // Tick 1 only takes ownership of the device.
        sampler.tick();
        assert!(sampler.is_connected());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_connected_tick_broadcasts_merged_snapshot() {
        let (mut sampler, pressed, mut rx) =
            make_sampler(vec![Ok(vec![ActiveKey::new(1, 0.8)])]);
        pressed.lock().unwrap().push(1);

        sampler.tick(); // discover
        sampler.tick(); // sample

        assert_eq!(rx.try_recv().unwrap(), "(1:0.800000:1)");
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_digital_overlay_merges_per_key() {
        let (mut sampler, pressed, mut rx) = make_sampler(vec![Ok(vec![
            ActiveKey::new(26, 0.5),
            ActiveKey::new(4, 0.1),
        ])]);
        // Only key 26 has crossed its digital actuation point.
        pressed.lock().unwrap().push(26);

        sampler.tick();
        sampler.tick();

        assert_eq!(rx.try_recv().unwrap(), "(26:0.500000:1)(4:0.100000:0)");
    }

    #[test]
    fn test_unchanged_state_is_not_rebroadcast() {
        let samples = vec![ActiveKey::new(4, 1.0)];
        let (mut sampler, _pressed, mut rx) =
            make_sampler(vec![Ok(samples.clone()), Ok(samples)]);

        sampler.tick();
        sampler.tick();
        sampler.tick();

        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_release_precedes_snapshot_in_channel_order() {
        let (mut sampler, _pressed, mut rx) = make_sampler(vec![
            Ok(vec![ActiveKey::new(1, 0.8)]),
            Ok(vec![]),
        ]);

        sampler.tick(); // discover
        sampler.tick(); // "(1:0.800000:0)"
        sampler.tick(); // release + empty snapshot

        assert_eq!(rx.try_recv().unwrap(), "(1:0.800000:0)");
        assert_eq!(rx.try_recv().unwrap(), "(1:0:0)");
        assert_eq!(rx.try_recv().unwrap(), "");
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_read_disconnection_returns_handle_to_discovery() {
        let (mut sampler, _pressed, mut rx) =
            make_sampler(vec![Err(DeviceError::Disconnected)]);

        sampler.tick(); // discover
        assert!(sampler.is_connected());
        sampler.tick(); // read fails -> Disconnected
        assert!(!sampler.is_connected());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_reconnection_after_device_loss() {
        let (digital, _pressed) = MockDigitalSource::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut enumerator = ScriptedEnumerator::with_device(Box::new(
            ScriptedAnalogueKeyboard::new([Err(DeviceError::Disconnected)]),
        ));
        // Second discovery attempt finds a fresh device.
        enumerator.push_batch(vec![Box::new(ScriptedAnalogueKeyboard::new([Ok(vec![
            ActiveKey::new(7, 0.25),
        ])]))]);

        let mut sampler = Sampler::new(
            Box::new(enumerator),
            DigitalOverlay::new(Box::new(digital)),
            tx,
            Duration::from_millis(0),
        );

        sampler.tick(); // discover first device
        sampler.tick(); // first device dies
        sampler.tick(); // discover second device
        sampler.tick(); // sample from second device

        assert_eq!(rx.try_recv().unwrap(), "(7:0.250000:0)");
    }
}
