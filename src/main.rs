//! keystate-bridge — entry point.
//!
//! Samples the state of an analogue keyboard (per-key actuation depth) plus
//! a digital (binary up/down) keyboard and republishes the merged state, on
//! every change, to all connected WebSocket subscribers.
//!
//! # Usage
//!
//! ```text
//! keystate-bridge [OPTIONS]
//!
//! Options:
//!   --port <PORT>                  WebSocket listener port [default: 32312]
//!   --bind <ADDR>                  Listener bind address [default: 0.0.0.0]
//!   --reconnect-backoff-ms <MS>    Sleep between device discovery attempts [default: 250]
//!   --read-timeout-ms <MS>         Upper bound on one analogue read [default: 10]
//! ```
//!
//! Each option can also be set through an environment variable
//! (`KEYSTATE_PORT`, `KEYSTATE_BIND`, `KEYSTATE_RECONNECT_BACKOFF_MS`,
//! `KEYSTATE_READ_TIMEOUT_MS`); CLI arguments take precedence.
//!
//! # Architecture overview
//!
//! ```text
//! main()
//!  ├─ Sampler::spawn()      dedicated OS thread: device discovery, per-tick
//!  │                        capture, change detection, release synthesis
//!  ├─ run_dispatcher()      tokio task: drains the sampler's FIFO channel,
//!  │                        fans payloads out to the subscriber registry
//!  └─ run_server()          tokio accept loop: WebSocket upgrades, one
//!                           session task per subscriber
//! ```

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keystate_bridge::domain::config::BridgeConfig;
use keystate_bridge::infrastructure::device::digital::PolledDigitalSource;
use keystate_bridge::infrastructure::device::hid::HidEnumerator;
use keystate_bridge::infrastructure::device::{DigitalOverlay, DigitalSource, NullDigitalSource};
use keystate_bridge::infrastructure::dispatcher::run_dispatcher;
use keystate_bridge::infrastructure::registry::SubscriberRegistry;
use keystate_bridge::infrastructure::sampler::Sampler;
use keystate_bridge::infrastructure::ws_server::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Analogue keyboard state → WebSocket pub/sub bridge.
#[derive(Debug, Parser)]
#[command(
    name = "keystate-bridge",
    about = "Broadcasts live analogue keyboard state to WebSocket subscribers",
    version
)]
struct Cli {
    /// TCP port for the WebSocket listener.
    #[arg(long, default_value_t = 32312, env = "KEYSTATE_PORT")]
    port: u16,

    /// IP address to bind the listener to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` to accept only local connections.
    #[arg(long, default_value = "0.0.0.0", env = "KEYSTATE_BIND")]
    bind: String,

    /// Milliseconds to sleep between analogue device discovery attempts
    /// while no device is plugged in.
    #[arg(long, default_value_t = 250, env = "KEYSTATE_RECONNECT_BACKOFF_MS")]
    reconnect_backoff_ms: u64,

    /// Milliseconds one blocking analogue read may wait for a new report
    /// before yielding the cached sample set.
    #[arg(long, default_value_t = 10, env = "KEYSTATE_READ_TIMEOUT_MS")]
    read_timeout_ms: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(BridgeConfig {
            ws_bind_addr,
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; level controlled by RUST_LOG, default info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;
    info!("keystate-bridge starting — ws={}", config.ws_bind_addr);

    // ── Device backends ───────────────────────────────────────────────────────
    //
    // A missing analogue keyboard is the normal Disconnected state; an
    // unusable HID subsystem is fatal.  A missing digital keyboard
    // degrades to an all-false overlay.
    let enumerator =
        HidEnumerator::new(config.read_timeout).context("failed to initialise HID subsystem")?;

    let digital: Box<dyn DigitalSource> = match PolledDigitalSource::new() {
        Some(source) => Box::new(source),
        None => {
            warn!("no pollable digital keyboard; digital readings will be all-up");
            Box::new(NullDigitalSource)
        }
    };

    // ── Wiring ────────────────────────────────────────────────────────────────
    let registry = Arc::new(SubscriberRegistry::new());
    let running = Arc::new(AtomicBool::new(true));

    // Sampler thread → dispatcher task, FIFO.
    let (broadcast_tx, broadcast_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(run_dispatcher(broadcast_rx, Arc::clone(&registry)));

    let sampler = Sampler::new(
        Box::new(enumerator),
        DigitalOverlay::new(digital),
        broadcast_tx,
        config.reconnect_backoff,
    );
    let sampler_thread = sampler
        .spawn(Arc::clone(&running))
        .context("failed to spawn sampler thread")?;

    // Ctrl+C clears the running flag; the accept loop and the sampler both
    // poll it and exit cleanly.
    let running_signal = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C — initiating graceful shutdown");
            running_signal.store(false, Ordering::Relaxed);
        }
    });

    // ── Main server loop ──────────────────────────────────────────────────────
    let result = run_server(config, registry, Arc::clone(&running)).await;

    // Stop the sampler even when the server failed to start.
    running.store(false, Ordering::Relaxed);
    if sampler_thread.join().is_err() {
        warn!("sampler thread panicked");
    }

    result?;
    info!("keystate-bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
