//! Notification broadcaster.
//!
//! Holds the registry of live `WebSocket` connections and fans a
//! notification out to all of them. Each connection is the sending half of
//! a bounded channel drained by that connection's socket task, so a slow
//! client never blocks a broadcast: when its queue is full the send fails
//! and the connection is pruned.
//!
//! Delivery is best-effort and at-most-once. There is no ordering guarantee
//! across connections.

use std::collections::HashMap;
use std::sync::Arc;

use flats_types::{Notification, SessionId};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// Smallest queue a connection may have.
const MIN_CAPACITY: usize = 1;

/// Sending half of one client's outbound queue.
#[derive(Debug, Clone)]
pub struct Connection {
    sender: mpsc::Sender<Arc<str>>,
}

impl Connection {
    /// Create a connection and the receiver its socket task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(MIN_CAPACITY));
        (Self { sender }, receiver)
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Registry of live connections.
#[derive(Debug, Default)]
pub struct Broadcaster {
    connections: RwLock<HashMap<SessionId, Connection>>,
}

impl Broadcaster {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the connection for `id`.
    pub async fn register(&self, id: SessionId, connection: Connection) {
        let count = {
            let mut connections = self.connections.write().await;
            connections.insert(id, connection);
            connections.len()
        };
        debug!(session_id = %id, connections = count, "Connection registered");
    }

    /// Remove the connection for `id`. Returns whether it was present.
    pub async fn deregister(&self, id: SessionId) -> bool {
        let removed = self.connections.write().await.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Connection deregistered");
        }
        removed
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send `notification` to every registered connection.
    ///
    /// Connections that are closed or whose queue is full are removed after
    /// the scan. Returns the number of successful deliveries.
    pub async fn broadcast(&self, notification: &Notification) -> usize {
        let text: Arc<str> = match notification.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(kind = notification.event.kind(), "Failed to serialize notification: {e}");
                return 0;
            }
        };

        let mut delivered: usize = 0;
        let mut dead = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, connection) in connections.iter() {
                if connection.is_closed() {
                    dead.push(*id);
                    continue;
                }
                match connection.sender.try_send(Arc::clone(&text)) {
                    Ok(()) => delivered = delivered.saturating_add(1),
                    Err(_) => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &dead {
                connections.remove(id);
            }
            warn!(pruned = dead.len(), "Pruned dead connections during broadcast");
        }

        debug!(kind = notification.event.kind(), delivered, "Notification broadcast");
        delivered
    }
}
