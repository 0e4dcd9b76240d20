//! Relay error types.
//!
//! [`CodecError`] covers everything that can go wrong turning bytes into a
//! [`crate::codec::Frame`] or a reply back into bytes. Codec errors are
//! logged and the frame dropped; they never close a connection.
//!
//! [`RelayError`] is the error type of the relay service and the HTTP
//! surface. Each variant maps to an HTTP status code and a structured JSON
//! body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{SessionId, SessionKey};

/// Errors raised while decoding or encoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A zero-length frame was received.
    #[error("empty frame")]
    EmptyFrame,

    /// A one-byte control frame carried a type tag this relay does not know.
    #[error("unknown control frame type {0:#05b}")]
    UnknownControlType(u8),

    /// A `SESSION_LIST` body was not a whole number of (id, count) pairs.
    #[error("session list body of {0} bytes is not a sequence of 2-byte entries")]
    TruncatedSessionList(usize),

    /// A data frame was not valid UTF-8.
    #[error("data frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A data frame was not a JSON object of a known shape.
    #[error("malformed JSON frame: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// A session has more members than a binary `SESSION_LIST` can carry.
    #[error("session {session_id} has {count} members, above the one-byte limit")]
    MemberCountOutOfRange {
        /// Offending session.
        session_id: SessionId,
        /// Its member count.
        count: usize,
    },

    /// Serializing an outbound data frame failed.
    #[error("failed to encode data frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Structured JSON error response body.
///
/// ```json
/// { "error": { "code": 3001, "message": "relay dispatcher is not running" } }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Relay service error with HTTP status code mapping.
///
/// | Range     | Category | HTTP Status                 |
/// |-----------|----------|-----------------------------|
/// | 2000–2999 | State    | 409 Conflict                |
/// | 3000–3999 | Server   | 503 Service Unavailable     |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The dispatcher task has stopped and can no longer take commands.
    #[error("relay dispatcher is not running")]
    DispatcherUnavailable,

    /// A join would exceed the session's member cap.
    #[error("session {session_id} is full ({capacity} members)")]
    SessionFull {
        /// Session that rejected the join.
        session_id: SessionKey,
        /// Configured cap.
        capacity: usize,
    },
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::SessionFull { .. } => 2001,
            Self::DispatcherUnavailable => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionFull { .. } => StatusCode::CONFLICT,
            Self::DispatcherUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(
            RelayError::DispatcherUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let full = RelayError::SessionFull {
            session_id: SessionKey::Id(SessionId::new(1)),
            capacity: 255,
        };
        assert_eq!(full.status_code(), StatusCode::CONFLICT);
        assert_eq!(full.error_code(), 2001);
    }

    #[test]
    fn into_response_sets_status() {
        let response = RelayError::DispatcherUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn codec_error_messages_are_readable() {
        assert_eq!(
            CodecError::UnknownControlType(0b010).to_string(),
            "unknown control frame type 0b010"
        );
        assert_eq!(
            CodecError::TruncatedSessionList(3).to_string(),
            "session list body of 3 bytes is not a sequence of 2-byte entries"
        );
    }
}
