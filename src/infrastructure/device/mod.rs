//! Device abstractions for the sampling loop.
//!
//! The sampler only ever talks to the traits defined here.  The production
//! implementations live in [`hid`] (analogue keyboard over `hidapi`) and
//! [`digital`] (binary keyboard over `device_query`); tests use the
//! scripted implementations in [`mock`].
//!
//! The two keyboards are independent collaborators: either may be present
//! or absent on its own, and only the analogue one has a connect/disconnect
//! lifecycle the sampler must track.

use thiserror::Error;
use tracing::debug;

use crate::domain::keys::{ActiveKey, KeyId, KEY_TABLE_SIZE};

pub mod digital;
pub mod hid;
pub mod mock;

/// Error type for analogue device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device went away mid-read.  Not fatal: the handle drops back to
    /// Disconnected and discovery resumes.
    #[error("analogue device disconnected")]
    Disconnected,
    /// The HID layer itself is unavailable (no hidraw support, missing
    /// permissions on the HID subsystem).  Fatal at startup.
    #[error("HID subsystem unavailable: {0}")]
    HidUnavailable(String),
}

/// One connected analogue keyboard.
///
/// `read_active_keys` returns the full current set of actuated keys in
/// device-reported order.  It may block briefly waiting for a new report, or
/// return the latest cached sample set when no new report arrived within the
/// device's read timeout.
pub trait AnalogueKeyboard: Send {
    fn read_active_keys(&mut self) -> Result<Vec<ActiveKey>, DeviceError>;
}

/// Enumerates currently attached analogue keyboards.
///
/// Ownership of a returned device transfers to the caller.  An empty result
/// is the normal answer while no device is plugged in.
pub trait DeviceEnumerator: Send {
    fn discover(&mut self) -> Vec<Box<dyn AnalogueKeyboard>>;
}

/// Source of binary pressed/released key state, polled once per tick.
pub trait DigitalSource: Send {
    /// Returns the keys currently reported as down.
    fn pressed_keys(&mut self) -> Vec<KeyId>;
}

/// A digital source for machines with no pollable digital keyboard: every
/// key is always up.
pub struct NullDigitalSource;

impl DigitalSource for NullDigitalSource {
    fn pressed_keys(&mut self) -> Vec<KeyId> {
        Vec::new()
    }
}

// ── Device handle ─────────────────────────────────────────────────────────────

/// Connection state of the analogue keyboard.
///
/// ```text
/// Disconnected ──(discovery finds a device)──► Connected
///       ▲                                          │
///       └────────(read reports disconnection)──────┘
/// ```
pub enum DeviceHandle {
    /// No analogue device owned.  The sampler retries discovery each tick.
    Disconnected,
    /// An analogue device is owned and readable.
    Connected(Box<dyn AnalogueKeyboard>),
}

impl DeviceHandle {
    pub fn is_connected(&self) -> bool {
        matches!(self, DeviceHandle::Connected(_))
    }
}

// ── Digital overlay ───────────────────────────────────────────────────────────

/// Fixed-size pressed/released table for every key, refreshed once per tick
/// from a [`DigitalSource`].
///
/// The overlay always succeeds: a missing or empty digital source simply
/// yields an all-false table.
pub struct DigitalOverlay {
    source: Box<dyn DigitalSource>,
    keys: [bool; KEY_TABLE_SIZE],
}

impl DigitalOverlay {
    pub fn new(source: Box<dyn DigitalSource>) -> Self {
        Self {
            source,
            keys: [false; KEY_TABLE_SIZE],
        }
    }

    /// Refreshes the whole table from the underlying source.
    pub fn update(&mut self) {
        self.keys = [false; KEY_TABLE_SIZE];
        for key in self.source.pressed_keys() {
            match self.keys.get_mut(key as usize) {
                Some(slot) => *slot = true,
                None => debug!("digital source reported out-of-table key {key}"),
            }
        }
    }

    /// Whether the digital keyboard currently reports `key` as down.
    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
