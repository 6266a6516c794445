//! Key identity and per-tick sample types.
//!
//! # Key identity
//!
//! Both keyboards report keys as **USB HID Usage IDs** (page 0x07,
//! Keyboard/Keypad page).  HID codes represent physical key positions, not
//! characters, so they are stable across keyboard layouts, across the
//! analogue and digital readings of the same key, and across device
//! reconnects.  That stability is what makes the canonical snapshot string
//! comparable from tick to tick.

/// Stable identifier for a physical key: its USB HID Usage ID (page 0x07).
///
/// `0` is never a valid key (HID 0x00 is "no event") and is used as a report
/// terminator by the analogue device.
pub type KeyId = u16;

/// Size of the digital overlay's pressed-key table.
///
/// HID keyboard usage IDs fit in a single byte (the highest assigned key is
/// Right GUI, 0xE7), so a 256-entry table covers every key either keyboard
/// can report.
pub const KEY_TABLE_SIZE: usize = 256;

/// One analogue reading, fresh from the device: a key that is currently
/// actuated and how far it is pressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveKey {
    /// Which key.
    pub key: KeyId,
    /// Actuation depth in `0.0..=1.0` (0 = at rest, 1 = bottomed out).
    pub value: f32,
}

impl ActiveKey {
    pub fn new(key: KeyId, value: f32) -> Self {
        Self { key, value }
    }
}

/// One merged sample for the current tick: the analogue reading plus the
/// digital keyboard's opinion of the same key.
///
/// Produced by the sampling loop (analogue reading + digital overlay lookup)
/// and consumed by the snapshot encoder.  Not persisted anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySample {
    /// Which key.
    pub key: KeyId,
    /// Analogue actuation depth in `0.0..=1.0`.
    pub value: f32,
    /// Whether the digital keyboard currently reports the key as down.
    ///
    /// This can lag the analogue reading: an analogue keyboard registers a
    /// key well before its digital actuation point.
    pub digital: bool,
}

impl KeySample {
    pub fn new(key: KeyId, value: f32, digital: bool) -> Self {
        Self {
            key,
            value,
            digital,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_covers_highest_hid_usage() {
        // Right GUI (0xE7) is the highest keyboard usage ID; the table must
        // be indexable by it.
        assert!(0xE7 < KEY_TABLE_SIZE);
    }

    #[test]
    fn test_active_key_constructor() {
        let ak = ActiveKey::new(0x04, 0.5);
        assert_eq!(ak.key, 0x04);
        assert_eq!(ak.value, 0.5);
    }

    #[test]
    fn test_key_sample_constructor() {
        let s = KeySample::new(0x04, 0.5, true);
        assert_eq!(s.key, 0x04);
        assert_eq!(s.value, 0.5);
        assert!(s.digital);
    }
}
