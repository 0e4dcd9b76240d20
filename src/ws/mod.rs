//! WebSocket layer: upgrade handling and the per-connection loop.
//!
//! The relay endpoint is mounted at `/` (where browser clients connect) and
//! at `/ws`. Text and binary messages are both fed to the wire codec.

pub mod connection;
pub mod handler;
