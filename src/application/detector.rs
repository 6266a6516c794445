//! Change detection between sampling ticks.
//!
//! The detector remembers the previously broadcast snapshot string and the
//! set of keys known to be down ("activated keys").  Each tick it decides
//! whether anything changed and, if so, which payloads to broadcast.
//!
//! # Why synthesize release payloads?
//!
//! The snapshot alone carries no history.  A subscriber that joins between
//! two non-overlapping key-press bursts would never learn that an earlier
//! key was released — the new snapshot simply doesn't mention it.  So when
//! keys vanish from the active set, the detector emits an explicit release
//! payload (`(<id>:0:0)` per key) *before* the new snapshot, carrying that
//! transition explicitly.
//!
//! # Per-tick algorithm
//!
//! 1. Encode the current samples.
//! 2. If the encoding equals the previous one: emit nothing.
//! 3. Otherwise:
//!    a. `released` = activated keys not present in the current samples.
//!    b. If `released` is non-empty, emit its release payload first and
//!       reset the activated set to exactly the current keys.
//!    c. Remember the new encoding, emit it, and union the current keys
//!       into the activated set.

use std::collections::BTreeSet;

use crate::application::snapshot::{encode_release, encode_snapshot};
use crate::domain::keys::{KeyId, KeySample};

/// Stateful diff of consecutive snapshots.
///
/// Owned and driven exclusively by the sampling loop; the rest of the system
/// only ever sees the payload strings it emits.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    /// Canonical string of the last emitted snapshot.  Starts empty, so the
    /// first non-empty tick always broadcasts.
    previous: String,
    /// Keys considered "currently down" as of the last emitted snapshot.
    ///
    /// A `BTreeSet` keeps release payloads in ascending key order, making
    /// them deterministic.
    activated: BTreeSet<KeyId>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one tick's merged samples and returns the payloads to
    /// broadcast, in delivery order: zero (no change), one (snapshot), or
    /// two (release payload, then snapshot).
    pub fn observe(&mut self, samples: &[KeySample]) -> Vec<String> {
        let current = encode_snapshot(samples);
        if current == self.previous {
            return Vec::new();
        }

        let current_keys: BTreeSet<KeyId> = samples.iter().map(|s| s.key).collect();
        let mut payloads = Vec::with_capacity(2);

        let released: Vec<KeyId> = self
            .activated
            .difference(&current_keys)
            .copied()
            .collect();
        if !released.is_empty() {
            payloads.push(encode_release(&released));
            // Re-init with only the keys that are active this tick; the
            // union below is then a no-op, but keeps step (c) unconditional.
            self.activated = current_keys.clone();
        }

        self.previous = current.clone();
        payloads.push(current);
        self.activated.extend(current_keys);
        payloads
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
