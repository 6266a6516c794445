//! WebSocket server: accept loop and per-session tasks.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading each connection to a WebSocket session.
//! 4. Registering the session in the [`SubscriberRegistry`], which is the
//!    moment it starts receiving broadcast snapshots.
//! 5. Forwarding broadcast payloads to the socket until the peer goes away,
//!    then unregistering.
//!
//! The protocol is strictly one-way: subscribers receive snapshot text
//! frames and send nothing.  Inbound frames other than Close are drained and
//! ignored.
//!
//! # Scalability
//!
//! Each session runs in its own tokio task; the accept loop never blocks on
//! a session.  A slow subscriber only grows its own outbound queue — it can
//! never stall the sampler or the other subscribers.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::config::BridgeConfig;
use crate::infrastructure::registry::SubscriberRegistry;

/// Runs the accept loop until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (port in use,
/// missing permission).  This is fatal at startup: without the listener the
/// bridge has no subscribers to serve.
pub async fn run_server(
    config: BridgeConfig,
    registry: Arc<SubscriberRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind TCP/{}", config.ws_bind_addr))?;

    info!("listening on {}", config.ws_bind_addr);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on accept() lets the loop notice the shutdown flag
        // even when no one is connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    handle_subscriber_session(stream, peer_addr, registry).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error (e.g. out of file descriptors);
                // keep serving existing subscribers.
                warn!("accept error: {e}");
            }
            Err(_) => {
                // Timeout — loop back to check the running flag.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task; wraps [`run_session`] and logs the
/// outcome so `?` can be used inside.
async fn handle_subscriber_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
) {
    match run_session(raw_stream, peer_addr, registry).await {
        Ok(()) => info!("subscriber {peer_addr} closed normally"),
        Err(e) => warn!("subscriber {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one subscriber connection.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
) -> anyhow::Result<()> {
    // Complete the WebSocket upgrade handshake.
    let ws_stream = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Registering the outbound queue is what makes this connection a
    // subscriber: broadcasts from this moment on are delivered to it.
    let id = Uuid::new_v4();
    let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
    registry.add(id, out_tx).await;
    info!("subscriber {id} connected from {peer_addr}");

    loop {
        tokio::select! {
            // Broadcast payload to forward.
            maybe_msg = out_rx.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        if ws_tx.send(msg).await.is_err() {
                            debug!("subscriber {id}: send failed (peer disconnected)");
                            break;
                        }
                    }
                    // Registry entry dropped elsewhere; nothing left to send.
                    None => break,
                }
            }

            // Inbound traffic: only relevant for detecting the close.
            maybe_frame = ws_rx.next() => {
                match maybe_frame {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("subscriber {id}: connection closed by peer");
                        break;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // tungstenite answers pings when the sink flushes.
                    }
                    Some(Ok(_)) => {
                        // The protocol is one-way; anything the client sends
                        // is ignored.
                    }
                    Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                        debug!("subscriber {id}: connection ended");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("subscriber {id}: WebSocket error: {e}");
                        break;
                    }
                }
            }
        }
    }

    registry.remove(id).await;
    info!("subscriber {id} disconnected");
    Ok(())
}
