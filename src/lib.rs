//! # snake-relay
//!
//! Realtime WebSocket relay for the multiplayer snake demo.
//!
//! Browser clients each own one snake. The relay groups them into numbered
//! sessions, stores the latest state each client reports, and fans it out
//! to everyone else in the same session. It never simulates anything; it
//! only relays client-reported state and answers "which sessions exist"
//! queries.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS connection tasks (ws/)  ── Frame::decode (codec/)
//!     ├── REST handlers (api/)
//!     │
//!     ├── RelayHandle ──mpsc──▶ relay task (service/)
//!     │                          └── Dispatcher
//!     │                               ├── SessionStore (domain/)
//!     │                               ├── ConnectionRegistry (domain/)
//!     │                               └── broadcast
//!     │
//!     └── per-connection outbound queues ──▶ sockets
//! ```

pub mod api;
pub mod app_state;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application router: WebSocket relay, REST API, and
/// (with the `swagger-ui` feature) the Swagger UI.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(api::build_router())
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
