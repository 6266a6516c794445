//! Broadcast dispatcher: the bridge between the sampler thread and the
//! subscriber sessions.
//!
//! The dispatcher task drains the sampler's FIFO channel and, for each
//! payload, asks the [`SubscriberRegistry`] to deliver it to every current
//! subscriber.  One payload is consumed exactly once: it is not retried and
//! not queued per-subscriber beyond the session's own outbound queue.
//!
//! Because a single task drains a FIFO channel, subscribers observe payloads
//! in exactly the order the sampler submitted them — in particular, a
//! synthetic release payload always arrives before the snapshot that
//! superseded it.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::infrastructure::registry::SubscriberRegistry;

/// Drains `rx` until the sampler drops its sender (shutdown), fanning each
/// payload out to all registered subscribers.
///
/// Per-recipient failures are not surfaced: a broken connection detects and
/// tears itself down in its own session task.
pub async fn run_dispatcher(
    mut rx: UnboundedReceiver<String>,
    registry: Arc<SubscriberRegistry>,
) {
    while let Some(payload) = rx.recv().await {
        let delivered = registry.broadcast(&payload).await;
        debug!(
            "dispatched {} byte snapshot to {delivered} subscriber(s)",
            payload.len()
        );
    }
    debug!("broadcast channel closed; dispatcher exiting");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
