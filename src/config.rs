//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

use crate::service::MAX_MEMBERS_PER_SESSION;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Capacity of the queue between connection tasks and the relay task.
    pub dispatch_queue_capacity: usize,

    /// Outbound queue length per connection. A full queue means the
    /// transport is not ready and broadcasts skip it.
    pub outbound_buffer_capacity: usize,

    /// Members allowed per session, at most 255.
    pub max_members_per_session: usize,

    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_frame_bytes: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            dispatch_queue_capacity: 1024,
            outbound_buffer_capacity: 64,
            max_members_per_session: MAX_MEMBERS_PER_SESSION,
            max_frame_bytes: 64 * 1024,
            log_json: false,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to [`RelayConfig::default`] for unset or unparsable
    /// numeric values. Calls `dotenvy::dotenv().ok()` to optionally load a
    /// `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let max_members_per_session =
            parse_env("MAX_MEMBERS_PER_SESSION", defaults.max_members_per_session)
                .min(MAX_MEMBERS_PER_SESSION);

        Ok(Self {
            listen_addr,
            dispatch_queue_capacity: parse_env(
                "DISPATCH_QUEUE_CAPACITY",
                defaults.dispatch_queue_capacity,
            ),
            outbound_buffer_capacity: parse_env(
                "OUTBOUND_BUFFER_CAPACITY",
                defaults.outbound_buffer_capacity,
            ),
            max_members_per_session,
            max_frame_bytes: parse_env("MAX_FRAME_BYTES", defaults.max_frame_bytes),
            log_json: parse_env_bool("LOG_JSON", defaults.log_json),
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
