//! Canonical snapshot encoding.
//!
//! One tick's merged key samples serialize to a single string that doubles
//! as the wire payload *and* the equality key for change detection: two
//! snapshots are equal iff their encoded strings are equal.  The encoding is
//! therefore a pure function of the sample sequence — no timestamps, no
//! randomness — and sample order is preserved exactly as the device reported
//! it (sorting would change the canonical string).
//!
//! # Wire format
//!
//! One parenthesised triple per active key, no separators:
//!
//! ```text
//! (<key id decimal>:<actuation, 6 fractional digits>:<digital '1'/'0'>)
//! ```
//!
//! Example — W (HID 26) half-pressed past its digital actuation point, and
//! A (HID 4) just touched:
//!
//! ```text
//! (26:0.500000:1)(4:0.100000:0)
//! ```
//!
//! A tick with no active keys encodes to the empty string, which is a valid
//! payload: it tells subscribers "all keys are up".

use std::fmt::Write;

use crate::domain::keys::{KeyId, KeySample};

/// Encodes one tick's merged samples into the canonical snapshot string.
///
/// Deterministic and total: same samples in the same order always yield the
/// same string.
pub fn encode_snapshot(samples: &[KeySample]) -> String {
    let mut out = String::with_capacity(samples.len() * 16);
    for sample in samples {
        // Infallible: writing to a String cannot fail.
        let _ = write!(
            out,
            "({}:{:.6}:{})",
            sample.key,
            sample.value,
            if sample.digital { '1' } else { '0' }
        );
    }
    out
}

/// Encodes a synthetic release snapshot for keys that are no longer active.
///
/// Every released key is reported with actuation `0` and digital `0` — the
/// bare integer form, distinct from a live `0.000000` reading, marks the
/// entry as synthesized rather than measured.
pub fn encode_release(keys: &[KeyId]) -> String {
    let mut out = String::with_capacity(keys.len() * 8);
    for key in keys {
        let _ = write!(out, "({key}:0:0)");
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
