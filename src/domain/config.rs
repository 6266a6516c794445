//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It can be constructed from CLI arguments (preferred for production) or
//! from sensible defaults (useful for local development and tests).
//!
//! Keeping configuration as a plain struct — no global state, no environment
//! variable reads inside the domain — makes the bridge easy to embed in
//! tests.  The binary entry point is responsible for populating the struct
//! from CLI args or environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// All runtime configuration for the bridge.
///
/// Build this struct once at startup and hand clones to the components that
/// need it (it is small and `Copy`-adjacent; cloning is cheap).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The address and port the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts connections from any network interface.  Set to
    /// `127.0.0.1` to accept only local connections.
    pub ws_bind_addr: SocketAddr,

    /// How long the sampler sleeps between device discovery attempts while
    /// no analogue keyboard is present.
    ///
    /// Absence of a device is not an error — it is the normal Disconnected
    /// state, retried forever.  The sleep just keeps the retry from pegging
    /// a core.
    pub reconnect_backoff: Duration,

    /// Upper bound on one blocking analogue read.
    ///
    /// A read that times out yields the device's latest cached sample set,
    /// so this value also bounds the sampling tick length while keys are
    /// held steady.
    pub read_timeout: Duration,
}

impl Default for BridgeConfig {
    /// Returns a `BridgeConfig` suitable for local development without any
    /// external configuration: listen on all interfaces, TCP/32312.
    fn default() -> Self {
        Self {
            // Safe: compile-time-known valid socket address string.
            ws_bind_addr: "0.0.0.0:32312".parse().unwrap(),
            reconnect_backoff: Duration::from_millis(250),
            read_timeout: Duration::from_millis(10),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
