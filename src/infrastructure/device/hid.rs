//! Analogue keyboard access over raw HID.
//!
//! Analogue keyboards expose their per-key actuation data on a vendor-defined
//! HID usage page (0xFF54) alongside the ordinary keyboard interface.  The
//! analogue interface delivers input reports containing a sequence of
//! `(scancode: u16 big-endian, value: u8)` triples, terminated by a zero
//! scancode; `value` is the actuation depth scaled to `0..=255`.  Scancodes
//! are USB HID usage IDs, the same identifiers the digital overlay uses.
//!
//! On Linux the hidraw node for the vendor interface is root-only by
//! default; grant access with a udev rule, e.g.:
//!
//! ```text
//! KERNEL=="hidraw*", ATTRS{idVendor}=="31e3", MODE="0660", GROUP="plugdev"
//! ```

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, warn};

use crate::domain::keys::ActiveKey;
use crate::infrastructure::device::{AnalogueKeyboard, DeviceEnumerator, DeviceError};

/// Vendor usage page carrying analogue key data.
pub const ANALOGUE_USAGE_PAGE: u16 = 0xFF54;

/// HID input reports are at most 64 bytes (+1 report id byte).
const REPORT_BUF_LEN: usize = 65;

// ── Enumerator ────────────────────────────────────────────────────────────────

/// Discovers analogue keyboards by scanning the HID device list for the
/// vendor usage page.
pub struct HidEnumerator {
    api: HidApi,
    read_timeout: Duration,
}

impl HidEnumerator {
    /// Initialises the HID subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::HidUnavailable`] when the platform HID layer
    /// cannot be initialised at all (this is fatal at startup; a merely
    /// absent keyboard is not).
    pub fn new(read_timeout: Duration) -> Result<Self, DeviceError> {
        let api = HidApi::new().map_err(|e| DeviceError::HidUnavailable(e.to_string()))?;
        Ok(Self { api, read_timeout })
    }
}

impl DeviceEnumerator for HidEnumerator {
    fn discover(&mut self) -> Vec<Box<dyn AnalogueKeyboard>> {
        if let Err(e) = self.api.refresh_devices() {
            warn!("HID device list refresh failed: {e}");
            return Vec::new();
        }

        let mut found: Vec<Box<dyn AnalogueKeyboard>> = Vec::new();
        for info in self.api.device_list() {
            if info.usage_page() != ANALOGUE_USAGE_PAGE {
                continue;
            }
            match info.open_device(&self.api) {
                Ok(device) => {
                    debug!(
                        "opened analogue keyboard {:04x}:{:04x} ({})",
                        info.vendor_id(),
                        info.product_id(),
                        info.product_string().unwrap_or("?"),
                    );
                    found.push(Box::new(HidAnalogueKeyboard::new(device, self.read_timeout)));
                }
                Err(e) => {
                    // Typically a permissions problem; discovery will retry.
                    warn!(
                        "found analogue keyboard {:04x}:{:04x} but open failed: {e}",
                        info.vendor_id(),
                        info.product_id(),
                    );
                }
            }
        }
        found
    }
}

// ── Device ────────────────────────────────────────────────────────────────────

/// One opened analogue keyboard.
///
/// The device only sends a report when the analogue state changes, so a read
/// that times out is answered from the cached sample set — the physical
/// state is unchanged by definition.
pub struct HidAnalogueKeyboard {
    device: HidDevice,
    read_timeout_ms: i32,
    cached: Vec<ActiveKey>,
}

impl HidAnalogueKeyboard {
    pub fn new(device: HidDevice, read_timeout: Duration) -> Self {
        Self {
            device,
            read_timeout_ms: read_timeout.as_millis() as i32,
            cached: Vec::new(),
        }
    }
}

impl AnalogueKeyboard for HidAnalogueKeyboard {
    fn read_active_keys(&mut self) -> Result<Vec<ActiveKey>, DeviceError> {
        let mut buf = [0u8; REPORT_BUF_LEN];
        match self.device.read_timeout(&mut buf, self.read_timeout_ms) {
            // Timeout: no new report, the cached state stands.
            Ok(0) => Ok(self.cached.clone()),
            Ok(n) => {
                self.cached = parse_analogue_report(&buf[..n]);
                Ok(self.cached.clone())
            }
            // hidapi reports unplug as a read error.
            Err(e) => {
                debug!("analogue read failed: {e}");
                Err(DeviceError::Disconnected)
            }
        }
    }
}

/// Decodes one vendor-page input report into active key samples.
///
/// Layout: repeated `[scancode_hi, scancode_lo, value]` triples; a zero
/// scancode terminates the list.  Keys the report omits are at rest.
fn parse_analogue_report(report: &[u8]) -> Vec<ActiveKey> {
    let mut keys = Vec::new();
    for triple in report.chunks_exact(3) {
        let scancode = u16::from_be_bytes([triple[0], triple[1]]);
        if scancode == 0 {
            break;
        }
        keys.push(ActiveKey::new(scancode, f32::from(triple[2]) / 255.0));
    }
    keys
}

// ── Tests ─────────────────────────────────────────────────────────────────────
