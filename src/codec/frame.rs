//! Single decode entry point and the outbound frame type.

use std::sync::Arc;

use super::control::ControlFrame;
use super::data::DataFrame;
use crate::error::CodecError;

/// An inbound or outbound frame in one of the two encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Fixed-layout binary control frame.
    Control(ControlFrame),
    /// JSON data frame.
    Data(DataFrame),
}

impl Frame {
    /// Decodes raw frame bytes.
    ///
    /// The binary control shape is tried first (see
    /// [`ControlFrame::matches`]); everything else is parsed as UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for an unknown control header, invalid
    /// UTF-8, or malformed JSON.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyFrame);
        }
        if ControlFrame::matches(bytes) {
            return ControlFrame::decode(bytes).map(Self::Control);
        }
        let text = std::str::from_utf8(bytes)?;
        DataFrame::parse(text).map(Self::Data)
    }

    /// Returns the wire name of the frame type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Control(frame) => frame.type_name(),
            Self::Data(frame) => frame.type_name(),
        }
    }
}

/// An encoded frame queued for one connection.
///
/// Payloads are reference counted so one encoding can be fanned out to a
/// whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Sent as a WebSocket text message.
    Text(Arc<str>),
    /// Sent as a WebSocket binary message.
    Binary(Arc<[u8]>),
}

impl OutboundFrame {
    /// Wraps JSON text.
    #[must_use]
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::Text(text.into())
    }

    /// Wraps binary bytes.
    #[must_use]
    pub fn binary(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Binary(bytes.into())
    }

    /// Returns the raw bytes of the frame.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes.as_ref(),
        }
    }
}
