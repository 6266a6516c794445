//! Infrastructure layer: everything that touches hardware, threads, or
//! sockets.
//!
//! - [`device`] — analogue/digital keyboard traits, the real `hidapi` and
//!   `device_query` backends, and scripted mocks for tests.
//! - [`sampler`] — the sampling loop, run on a dedicated OS thread.
//! - [`registry`] — the subscriber connection registry.
//! - [`dispatcher`] — drains the sampler's FIFO channel and fans payloads
//!   out to subscribers.
//! - [`ws_server`] — TCP listener, WebSocket upgrade, per-session tasks.

pub mod device;
pub mod dispatcher;
pub mod registry;
pub mod sampler;
pub mod ws_server;
