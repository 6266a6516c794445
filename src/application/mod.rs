//! Application layer: the pure sampling pipeline.
//!
//! - [`snapshot`] — deterministic serialization of one tick's key samples
//!   into the canonical wire string.
//! - [`detector`] — change detection between ticks, including synthesis of
//!   explicit "released" payloads for keys that vanished since the last
//!   broadcast.
//!
//! Everything here is side-effect free; the infrastructure layer owns the
//! devices and the sockets.

pub mod detector;
pub mod snapshot;

pub use detector::ChangeDetector;
pub use snapshot::{encode_release, encode_snapshot};
