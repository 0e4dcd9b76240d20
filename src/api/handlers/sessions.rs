//! Session directory over HTTP.
//!
//! Same data as a `FETCH_SESSIONS` frame, for tooling that does not speak
//! WebSocket.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::SessionDirectory;
use crate::error::{ErrorResponse, RelayError};

/// Directory of live sessions.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    /// Member count keyed by session id.
    pub sessions: BTreeMap<String, usize>,
    /// Number of live sessions.
    pub total_sessions: usize,
    /// Members across all sessions.
    pub total_members: usize,
}

impl From<SessionDirectory> for SessionListResponse {
    fn from(directory: SessionDirectory) -> Self {
        let total_members = directory.values().sum();
        Self {
            total_sessions: directory.len(),
            total_members,
            sessions: directory
                .into_iter()
                .map(|(id, count)| (id.to_string(), count))
                .collect(),
        }
    }
}

/// `GET /sessions` — List live sessions and their member counts.
///
/// # Errors
///
/// Returns [`RelayError::DispatcherUnavailable`] if the relay task has
/// stopped.
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    summary = "List sessions",
    description = "Returns every non-empty session with its member count, ordered by session id.",
    responses(
        (status = 200, description = "Session directory", body = SessionListResponse),
        (status = 503, description = "Relay task unavailable", body = ErrorResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RelayError> {
    let directory = state.relay.list_sessions().await?;
    Ok(Json(SessionListResponse::from(directory)))
}

/// Session routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sessions", get(list_sessions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionId;

    #[test]
    fn response_totals() {
        let directory: SessionDirectory = [(SessionId::new(5), 2), (SessionId::new(7), 1)]
            .into_iter()
            .collect();
        let response = SessionListResponse::from(directory);
        assert_eq!(response.total_sessions, 2);
        assert_eq!(response.total_members, 3);
        assert_eq!(response.sessions.get("5"), Some(&2));
    }
}
