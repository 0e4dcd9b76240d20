//! Shared application state injected into all Axum handlers.

use crate::service::RelayHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the relay task.
    pub relay: RelayHandle,
    /// Outbound queue length per WebSocket connection.
    pub outbound_capacity: usize,
    /// Largest inbound WebSocket message accepted.
    pub max_frame_bytes: usize,
}
