//! Subscriber connection registry.
//!
//! An explicit registry object replaces the classic "walk every worker the
//! scheduler knows and check for a tag" pattern: a connection *is* a
//! subscriber exactly while its outbound sender is registered here.  The
//! session task inserts its sender once, immediately after the WebSocket
//! upgrade completes, and removes it at teardown; the dispatcher only ever
//! reads the collection.
//!
//! # Synchronization
//!
//! The map sits behind a `tokio::sync::RwLock`: many concurrent broadcasts
//! may read it while sessions come and go.  A broadcast observes the set of
//! subscribers registered at the moment it takes the read lock — a
//! connection that registers mid-broadcast starts receiving from the next
//! payload onward.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// Registry of live subscriber connections, keyed by connection id.
///
/// Each value is the sending half of the session's outbound queue; the
/// session task forwards whatever arrives there to its WebSocket.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<Uuid, UnboundedSender<Message>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound sender.  From this point on the
    /// connection receives every broadcast payload.
    pub async fn add(&self, id: Uuid, tx: UnboundedSender<Message>) {
        self.subscribers.write().await.insert(id, tx);
    }

    /// Removes a connection.  Idempotent; called by the session task at
    /// teardown.
    pub async fn remove(&self, id: Uuid) {
        self.subscribers.write().await.remove(&id);
    }

    /// Number of currently registered subscribers.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Sends `payload` as a text frame to every registered subscriber and
    /// returns how many accepted it.
    ///
    /// A send only fails when the session task has already exited (its
    /// receiver is dropped); that connection is mid-teardown and will
    /// remove itself, so failures are simply skipped here.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;
        for tx in subscribers.values() {
            if tx.send(Message::Text(payload.to_owned())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
