//! Wire codec: binary control frames and JSON data frames on one channel.
//!
//! [`Frame::decode`] is the only entry point for inbound bytes. It checks
//! the fixed binary shape first and falls back to JSON.

pub mod control;
pub mod data;
pub mod frame;

pub use control::{ControlFrame, format_bits};
pub use data::{DataFrame, StateUpdate};
pub use frame::{Frame, OutboundFrame};
