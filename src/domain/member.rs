//! Session member records and the opaque entity state they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// Latest client-reported state of one snake.
///
/// The relay never inspects the fields (head color, body color, head
/// position, direction, ...). It stores and forwards them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityState(serde_json::Map<String, serde_json::Value>);

impl EntityState {
    /// Returns the value of a single field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

/// A session's record of one client.
#[derive(Debug, Clone)]
pub struct Member {
    /// Latest reported entity state.
    pub state: EntityState,

    /// Connection this member is routed through. A back-reference only;
    /// the connection task owns the socket.
    pub connection: ConnectionId,

    /// When the member first joined the session.
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Creates a member bound to `connection`.
    #[must_use]
    pub fn new(state: EntityState, connection: ConnectionId) -> Self {
        Self {
            state,
            connection,
            joined_at: Utc::now(),
        }
    }

    /// Replaces the entity state, keeping the connection binding.
    pub fn replace_state(&mut self, state: EntityState) {
        self.state = state;
    }
}
