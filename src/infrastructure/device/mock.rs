//! Scripted device implementations for unit and integration tests.
//!
//! These let tests drive the sampling loop tick by tick with exactly the
//! device behavior a scenario needs — connect, report, disconnect — without
//! any hardware or OS hooks.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::keys::{ActiveKey, KeyId};
use crate::infrastructure::device::{
    AnalogueKeyboard, DeviceEnumerator, DeviceError, DigitalSource,
};

/// One step of a scripted analogue keyboard: a sample set or a failure.
pub type ScriptStep = Result<Vec<ActiveKey>, DeviceError>;

/// Analogue keyboard that replays a fixed script of read results.
///
/// Once the script is exhausted, every further read reports disconnection,
/// which conveniently ends a test scenario.
pub struct ScriptedAnalogueKeyboard {
    script: VecDeque<ScriptStep>,
}

impl ScriptedAnalogueKeyboard {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl AnalogueKeyboard for ScriptedAnalogueKeyboard {
    fn read_active_keys(&mut self) -> Result<Vec<ActiveKey>, DeviceError> {
        self.script
            .pop_front()
            .unwrap_or(Err(DeviceError::Disconnected))
    }
}

/// Enumerator that hands out pre-built devices, one batch per discovery
/// attempt; later attempts find nothing.
pub struct ScriptedEnumerator {
    batches: VecDeque<Vec<Box<dyn AnalogueKeyboard>>>,
}

impl ScriptedEnumerator {
    /// An enumerator that never finds a device.
    pub fn empty() -> Self {
        Self {
            batches: VecDeque::new(),
        }
    }

    /// An enumerator whose first discovery attempt finds `device`.
    pub fn with_device(device: Box<dyn AnalogueKeyboard>) -> Self {
        Self {
            batches: VecDeque::from([vec![device]]),
        }
    }

    /// Queues another batch for a subsequent discovery attempt (used to test
    /// reconnection).
    pub fn push_batch(&mut self, batch: Vec<Box<dyn AnalogueKeyboard>>) {
        self.batches.push_back(batch);
    }
}

impl DeviceEnumerator for ScriptedEnumerator {
    fn discover(&mut self) -> Vec<Box<dyn AnalogueKeyboard>> {
        self.batches.pop_front().unwrap_or_default()
    }
}

/// Digital source whose pressed set is mutated externally through a shared
/// handle.
pub struct MockDigitalSource {
    pressed: Arc<Mutex<Vec<KeyId>>>,
}

impl MockDigitalSource {
    /// Returns the source and the handle a test uses to change the pressed
    /// set between ticks.
    pub fn new() -> (Self, Arc<Mutex<Vec<KeyId>>>) {
        let pressed = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                pressed: Arc::clone(&pressed),
            },
            pressed,
        )
    }
}

impl DigitalSource for MockDigitalSource {
    fn pressed_keys(&mut self) -> Vec<KeyId> {
        self.pressed.lock().expect("lock poisoned").clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
