//! Binary control frames used for the session directory.
//!
//! The top three bits of the first byte carry the frame type; the low five
//! bits are reserved and written as zero.
//!
//! ```text
//! FETCH_SESSIONS   000xxxxx
//! SESSION_LIST     001xxxxx  (id, count)*
//! ```

use std::fmt::Write as _;

use crate::domain::{SessionDirectory, SessionId};
use crate::error::CodecError;

/// Type tag of a `FETCH_SESSIONS` query.
pub const FETCH_SESSIONS_TAG: u8 = 0b000;
/// Type tag of a `SESSION_LIST` response.
pub const SESSION_LIST_TAG: u8 = 0b001;
/// Header byte of a `SESSION_LIST` response with the reserved bits cleared.
pub const SESSION_LIST_HEADER: u8 = SESSION_LIST_TAG << TAG_SHIFT;

const TAG_SHIFT: u8 = 5;

/// A decoded binary control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// Client asks for the session directory.
    FetchSessions,
    /// Server answers with every session and its member count.
    SessionList(SessionDirectory),
}

impl ControlFrame {
    /// Encodes the frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MemberCountOutOfRange`] if a session count does
    /// not fit in one byte. Counts are never truncated.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::FetchSessions => Ok(vec![FETCH_SESSIONS_TAG << TAG_SHIFT]),
            Self::SessionList(directory) => encode_session_list(directory),
        }
    }

    /// Returns the wire name of the frame type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::FetchSessions => "FETCH_SESSIONS",
            Self::SessionList(_) => "SESSION_LIST",
        }
    }

    /// Returns `true` if `bytes` has the shape of a control frame.
    ///
    /// Any single byte qualifies. Longer frames qualify only with an exact
    /// `SESSION_LIST` header and an even-length body.
    #[must_use]
    pub fn matches(bytes: &[u8]) -> bool {
        match bytes.split_first() {
            Some((_, [])) => true,
            Some((&header, body)) => header == SESSION_LIST_HEADER && body.len() % 2 == 0,
            None => false,
        }
    }

    /// Decodes a frame that passed [`ControlFrame::matches`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmptyFrame`] for no input,
    /// [`CodecError::UnknownControlType`] for an unknown type tag and
    /// [`CodecError::TruncatedSessionList`] for an odd-length body.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (&header, body) = bytes.split_first().ok_or(CodecError::EmptyFrame)?;
        match header >> TAG_SHIFT {
            FETCH_SESSIONS_TAG if body.is_empty() => Ok(Self::FetchSessions),
            SESSION_LIST_TAG => decode_session_list(body).map(Self::SessionList),
            tag => Err(CodecError::UnknownControlType(tag)),
        }
    }
}

fn encode_session_list(directory: &SessionDirectory) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(1 + directory.len() * 2);
    buf.push(SESSION_LIST_HEADER);
    for (&session_id, &count) in directory {
        let count = u8::try_from(count)
            .map_err(|_| CodecError::MemberCountOutOfRange { session_id, count })?;
        buf.push(session_id.as_u8());
        buf.push(count);
    }
    Ok(buf)
}

fn decode_session_list(body: &[u8]) -> Result<SessionDirectory, CodecError> {
    let chunks = body.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        return Err(CodecError::TruncatedSessionList(body.len()));
    }
    Ok(chunks
        .filter_map(|pair| match pair {
            [id, count] => Some((SessionId::new(*id), usize::from(*count))),
            _ => None,
        })
        .collect())
}

/// Renders bytes as space-separated 8-bit groups, e.g. `00100000 00000101`.
#[must_use]
pub fn format_bits(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 9);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:08b}");
    }
    out
}
