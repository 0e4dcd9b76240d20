//! JSON data frames.
//!
//! Every data frame is a JSON object with a `type` discriminator:
//!
//! ```json
//! {"type":"INITIALIZE","sessionId":"3","clientId":"a1","snakeInfo":{...}}
//! {"type":"ALL_SNAKES","snakes":{"a1":{...}}}
//! {"type":"DISCONNECT","clientId":"a1"}
//! {"type":"SESSION_LIST","sessions":{"5":2,"7":1}}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::{ClientId, EntityState, SessionDirectory, SessionKey, SessionSnapshot};
use crate::error::CodecError;

/// Fields shared by `INITIALIZE` and `GAME_STATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// Session the client plays in. Absent or placeholder ids mean
    /// [`SessionKey::Unset`].
    #[serde(default)]
    pub session_id: SessionKey,
    /// Reporting client.
    pub client_id: ClientId,
    /// The client's current snake.
    #[serde(default)]
    pub snake_info: EntityState,
}

/// A decoded JSON data frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFrame {
    /// Client → server: first join.
    Initialize(StateUpdate),
    /// Client → server: periodic state update.
    GameState(StateUpdate),
    /// Server → client: every snake in the session.
    AllSnakes {
        /// Entity state per client.
        snakes: SessionSnapshot,
    },
    /// Server → client: a client left the session.
    #[serde(rename_all = "camelCase")]
    Disconnect {
        /// The departed client.
        client_id: ClientId,
    },
    /// Client → server: JSON form of the directory query.
    FetchSessions,
    /// Server → client: JSON form of the directory.
    SessionList {
        /// Member count per session.
        sessions: SessionDirectory,
    },
    /// Any `type` this relay does not recognise.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl DataFrame {
    /// Parses a UTF-8 JSON data frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedJson`] when the text is not a JSON
    /// object, lacks `type`, or a known type is missing required fields.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(CodecError::MalformedJson)
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// Returns the wire name of the frame type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "INITIALIZE",
            Self::GameState(_) => "GAME_STATE",
            Self::AllSnakes { .. } => "ALL_SNAKES",
            Self::Disconnect { .. } => "DISCONNECT",
            Self::FetchSessions => "FETCH_SESSIONS",
            Self::SessionList { .. } => "SESSION_LIST",
            Self::Unknown => "UNKNOWN",
        }
    }
}
