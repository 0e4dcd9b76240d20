//! Live connections and the identity each one is bound to.
//!
//! Every upgraded socket registers an outbound queue here. The queue is
//! bounded; a full or closed queue is what "transport not ready" means to
//! the broadcast engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::{ClientId, ConnectionId, SessionKey};
use crate::codec::OutboundFrame;

/// Sending half of a connection's outbound queue.
pub type OutboundSender = mpsc::Sender<OutboundFrame>;

/// The (session, client) identity a connection speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Session the connection joined.
    pub session_id: SessionKey,
    /// Client identity the connection reported.
    pub client_id: ClientId,
}

/// Per-connection lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no INITIALIZE/GAME_STATE seen yet.
    Unbound,
    /// Bound to a session identity.
    Bound(Binding),
    /// The transport closed. Terminal.
    Closed,
}

/// Registry entry for one live connection.
#[derive(Debug)]
pub struct ConnectionEntry {
    outbound: OutboundSender,
    binding: Option<Binding>,
    /// When the socket was registered.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    /// Returns the current binding, if any.
    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }
}

/// Tracks live transports by [`ConnectionId`].
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly upgraded connection in the unbound state.
    pub fn register(&mut self, connection: ConnectionId, outbound: OutboundSender) {
        self.connections.insert(
            connection,
            ConnectionEntry {
                outbound,
                binding: None,
                connected_at: Utc::now(),
            },
        );
    }

    /// Binds a connection to an identity, returning the previous binding.
    ///
    /// Unknown connections are ignored.
    pub fn bind(&mut self, connection: ConnectionId, binding: Binding) -> Option<Binding> {
        self.connections
            .get_mut(&connection)
            .and_then(|entry| entry.binding.replace(binding))
    }

    /// Returns the binding of a connection.
    #[must_use]
    pub fn binding(&self, connection: ConnectionId) -> Option<&Binding> {
        self.connections.get(&connection)?.binding()
    }

    /// Returns the lifecycle state of a connection.
    #[must_use]
    pub fn state(&self, connection: ConnectionId) -> ConnectionState {
        match self.connections.get(&connection) {
            None => ConnectionState::Closed,
            Some(ConnectionEntry {
                binding: Some(binding),
                ..
            }) => ConnectionState::Bound(binding.clone()),
            Some(_) => ConnectionState::Unbound,
        }
    }

    /// Removes a connection, returning its entry.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<ConnectionEntry> {
        self.connections.remove(&connection)
    }

    /// Queues a frame for a connection if its transport is ready.
    ///
    /// Returns `false` when the connection is unknown, its queue is full, or
    /// its socket task has gone away. Nothing is retried.
    pub fn send(&self, connection: ConnectionId, frame: OutboundFrame) -> bool {
        let Some(entry) = self.connections.get(&connection) else {
            return false;
        };
        match entry.outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(connection_id = %connection, "outbound queue full, skipping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SessionId;

    fn binding(session: u8, client: &str) -> Binding {
        Binding {
            session_id: SessionKey::Id(SessionId::new(session)),
            client_id: client.into(),
        }
    }

    #[test]
    fn lifecycle_unbound_bound_closed() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(4);

        assert_eq!(registry.state(conn), ConnectionState::Closed);
        registry.register(conn, tx);
        assert_eq!(registry.state(conn), ConnectionState::Unbound);

        assert!(registry.bind(conn, binding(3, "a1")).is_none());
        assert_eq!(registry.state(conn), ConnectionState::Bound(binding(3, "a1")));

        assert!(registry.remove(conn).is_some());
        assert_eq!(registry.state(conn), ConnectionState::Closed);
        assert!(registry.is_empty());
    }

    #[test]
    fn bind_returns_previous_binding() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(4);
        registry.register(conn, tx);

        registry.bind(conn, binding(1, "a1"));
        let previous = registry.bind(conn, binding(2, "a1"));
        assert_eq!(previous, Some(binding(1, "a1")));
    }

    #[test]
    fn bind_unknown_connection_is_ignored() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        assert!(registry.bind(conn, binding(1, "a1")).is_none());
        assert_eq!(registry.state(conn), ConnectionState::Closed);
    }

    #[test]
    fn send_delivers_when_ready() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(4);
        registry.register(conn, tx);

        assert!(registry.send(conn, OutboundFrame::text("hello")));
        let Ok(frame) = rx.try_recv() else {
            panic!("frame should be queued");
        };
        assert_eq!(frame, OutboundFrame::text("hello"));
    }

    #[test]
    fn send_skips_full_and_closed_queues() {
        let mut registry = ConnectionRegistry::new();
        let full = ConnectionId::new();
        let (tx_full, _rx_full) = mpsc::channel(1);
        registry.register(full, tx_full);
        assert!(registry.send(full, OutboundFrame::text("1")));
        assert!(!registry.send(full, OutboundFrame::text("2")));

        let closed = ConnectionId::new();
        let (tx_closed, rx_closed) = mpsc::channel(1);
        registry.register(closed, tx_closed);
        drop(rx_closed);
        assert!(!registry.send(closed, OutboundFrame::text("x")));

        assert!(!registry.send(ConnectionId::new(), OutboundFrame::text("x")));
    }
}
