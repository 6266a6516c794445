//! keystate-bridge library crate.
//!
//! This crate continuously samples the physical state of an analogue keyboard
//! (per-key actuation depth, 0.0–1.0) together with a legacy digital (binary
//! up/down) keyboard, and republishes the merged state, on every change, to
//! any number of live WebSocket subscribers.  It is a realtime
//! sensor-to-pub/sub bridge.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Analogue HID device ──┐                          ┌── WebSocket subscriber
//! Digital keyboard ─────┤                          ├── WebSocket subscriber
//!                       ▼                          │
//!            [sampler thread]    ── mpsc FIFO ──►  [tokio runtime]
//!              read + merge                          dispatcher fans each
//!              encode + diff                         payload out to the
//!              release synthesis                     subscriber registry
//! ```
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` only — the snapshot encoder and change
//!   detector are pure and fully unit-testable.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tungstenite`, `hidapi`, and `device_query`.
//!
//! # Why a dedicated sampling thread?
//!
//! Device reads may block inside the HID layer and must never stall the
//! network event loop.  The sampler therefore runs on its own OS thread and
//! hands encoded snapshot strings to the tokio side through a thread-safe
//! FIFO channel; the dispatcher task drains it and fans each payload out to
//! every registered subscriber, preserving submission order end-to-end.

/// Domain layer: pure business-logic types (no I/O).
pub mod domain;

/// Application layer: snapshot encoding and change detection.
pub mod application;

/// Infrastructure layer: devices, sampler thread, WebSocket server.
pub mod infrastructure;

// Re-export the most-used types at the crate root so callers can write
// `keystate_bridge::ChangeDetector` instead of the full module path.
pub use application::detector::ChangeDetector;
pub use application::snapshot::{encode_release, encode_snapshot};
pub use domain::config::BridgeConfig;
pub use domain::keys::{ActiveKey, KeyId, KeySample, KEY_TABLE_SIZE};
pub use infrastructure::registry::SubscriberRegistry;
