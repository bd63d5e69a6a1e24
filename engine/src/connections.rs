//! Connection Manager
//!
//! Tracks live client connections and fans server messages out to them.
//! Each connection owns a bounded outbound queue drained by its socket loop
//! (see `server`), so a broadcast never waits on a slow socket: it enqueues
//! into every queue under one lock and returns.
//!
//! Holding the lock for the whole fan-out gives every client the same
//! relative order of messages. A connection whose queue is closed or full is
//! dropped from the set after the fan-out completes; other connections are
//! unaffected.

use sdk::errors::EngineError;
use sdk::protocol::ServerMessage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Opaque handle for one client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

pub struct ConnectionManager {
    connections: Mutex<BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl ConnectionManager {
    /// `queue_capacity` is the per-connection outbound buffer (at least 1)
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, mpsc::Sender<ServerMessage>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a connection; the receiver yields everything sent to it
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        self.add(None::<fn() -> ServerMessage>)
    }

    /// Add a connection whose first message is built by `greeting`.
    ///
    /// `greeting` runs under the connection lock, so no broadcast can be
    /// queued ahead of it or slip between it and registration.
    pub fn register_with<F>(&self, greeting: F) -> (ConnectionId, mpsc::Receiver<ServerMessage>)
    where
        F: FnOnce() -> ServerMessage,
    {
        self.add(Some(greeting))
    }

    fn add<F>(&self, greeting: Option<F>) -> (ConnectionId, mpsc::Receiver<ServerMessage>)
    where
        F: FnOnce() -> ServerMessage,
    {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let count = {
            let mut connections = self.lock();
            if let Some(greeting) = greeting {
                // Fresh queue with capacity >= 1, cannot be full or closed
                let _ = tx.try_send(greeting());
            }
            connections.insert(id, tx);
            connections.len()
        };
        info!("Client {} connected ({} active)", id, count);

        (id, rx)
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut connections = self.lock();
            let removed = connections.remove(&id).is_some();
            (removed, connections.len())
        };
        if removed {
            info!("Client {} disconnected ({} active)", id, count);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue `message` for every live connection.
    ///
    /// Returns how many connections accepted it. Connections that could not
    /// take the message are removed.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut connections = self.lock();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in connections.iter() {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => failed.push((*id, send_error(*id, &e))),
            }
        }

        for (id, error) in failed {
            connections.remove(&id);
            warn!("{}; dropping connection", error);
        }

        debug!(
            "Broadcast delivered to {} of {} connections",
            delivered,
            connections.len()
        );
        delivered
    }

    /// Queue `message` for a single connection
    pub fn send_to(&self, id: ConnectionId, message: ServerMessage) -> Result<(), EngineError> {
        let mut connections = self.lock();
        let sender = connections
            .get(&id)
            .ok_or_else(|| EngineError::ConnectionSend(id.to_string()))?;

        if let Err(e) = sender.try_send(message) {
            let error = send_error(id, &e);
            connections.remove(&id);
            warn!("{}; dropping connection", error);
            return Err(error);
        }
        Ok(())
    }
}

fn send_error<T>(id: ConnectionId, error: &TrySendError<T>) -> EngineError {
    let reason = match error {
        TrySendError::Full(_) => "outbound queue full",
        TrySendError::Closed(_) => "connection closed",
    };
    EngineError::ConnectionSend(format!("{} ({})", id, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection_in_order() {
        let manager = ConnectionManager::new(8);
        let (_a, mut rx_a) = manager.register();
        let (_b, mut rx_b) = manager.register();

        manager.broadcast(&ServerMessage::error("first"));
        manager.broadcast(&ServerMessage::error("second"));

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await, Some(ServerMessage::error("first")));
            assert_eq!(rx.recv().await, Some(ServerMessage::error("second")));
        }
    }

    #[tokio::test]
    async fn test_closed_connection_is_removed_without_affecting_others() {
        let manager = ConnectionManager::new(8);
        let (_a, rx_a) = manager.register();
        let (_b, mut rx_b) = manager.register();
        drop(rx_a);

        assert_eq!(manager.broadcast(&ServerMessage::Pong), 1);
        assert_eq!(manager.len(), 1);
        assert_eq!(rx_b.recv().await, Some(ServerMessage::Pong));

        assert_eq!(manager.broadcast(&ServerMessage::Pong), 1);
        assert_eq!(rx_b.recv().await, Some(ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_full_queue_drops_connection() {
        let manager = ConnectionManager::new(1);
        let (slow, _rx_slow) = manager.register();
        let (_fast, mut rx_fast) = manager.register();

        manager.broadcast(&ServerMessage::error("one"));
        rx_fast.recv().await;
        assert_eq!(manager.broadcast(&ServerMessage::error("two")), 1);

        assert!(!manager.remove(slow));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_targets_one_connection() {
        let manager = ConnectionManager::new(4);
        let (a, mut rx_a) = manager.register();
        let (_b, mut rx_b) = manager.register();

        manager.send_to(a, ServerMessage::Pong).unwrap();
        assert_eq!(rx_a.recv().await, Some(ServerMessage::Pong));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_send_to_unknown_connection() {
        let manager = ConnectionManager::new(4);
        let (id, _rx) = manager.register();
        assert!(manager.remove(id));
        assert!(matches!(
            manager.send_to(id, ServerMessage::Pong),
            Err(EngineError::ConnectionSend(_))
        ));
    }

    #[tokio::test]
    async fn test_greeting_is_first_message() {
        let manager = ConnectionManager::new(4);
        let (_id, mut rx) = manager.register_with(|| ServerMessage::error("hello"));
        manager.broadcast(&ServerMessage::Pong);

        assert_eq!(rx.recv().await, Some(ServerMessage::error("hello")));
        assert_eq!(rx.recv().await, Some(ServerMessage::Pong));
    }

    #[test]
    fn test_ids_are_unique() {
        let manager = ConnectionManager::new(4);
        let (a, _ra) = manager.register();
        let (b, _rb) = manager.register();
        assert_ne!(a, b);
        assert_eq!(manager.len(), 2);
    }
}
