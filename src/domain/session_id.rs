//! Session and client identifiers.
//!
//! [`SessionId`] is a one-byte newtype so that every session the store can
//! hold is representable in a binary `SESSION_LIST` frame. On the JSON path
//! it travels as a decimal string key. [`SessionKey`] is what a state
//! update actually carries: either a valid id or the unset placeholder some
//! browsers send before a session is picked. [`ClientId`] is the opaque,
//! client-generated identity of one browser tab.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal values browsers send when the session id was never set.
const UNSET_PLACEHOLDERS: [&str; 3] = ["", "undefined", "null"];

/// Error returned when a session id cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionIdError {
    /// The value was empty or an unset placeholder such as `"undefined"`.
    #[error("session id is unset")]
    Unset,
    /// The value was not a decimal integer in `0..=255`.
    #[error("session id {0:?} is not an integer in 0..=255")]
    OutOfRange(String),
}

/// Identifier of a session, in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u8);

impl SessionId {
    /// Creates a `SessionId` from its wire byte.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the wire byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for SessionId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if UNSET_PLACEHOLDERS.contains(&trimmed) {
            return Err(SessionIdError::Unset);
        }
        trimmed
            .parse::<u8>()
            .map(Self)
            .map_err(|_| SessionIdError::OutOfRange(s.to_string()))
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SessionIdVisitor)
    }
}

/// Accepts `"5"` and `5` alike.
struct SessionIdVisitor;

impl Visitor<'_> for SessionIdVisitor {
    type Value = SessionId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a session id between 0 and 255, as a string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        u8::try_from(v)
            .map(SessionId)
            .map_err(|_| E::custom(SessionIdError::OutOfRange(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u8::try_from(v)
            .map(SessionId)
            .map_err(|_| E::custom(SessionIdError::OutOfRange(v.to_string())))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(E::custom(SessionIdError::Unset))
    }
}

/// Session a state update addresses.
///
/// Clients that never picked a session omit `sessionId` or send one of the
/// unset placeholders. They still play together under [`SessionKey::Unset`];
/// that session is simply never advertised in the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionKey {
    /// No session id was given.
    #[default]
    Unset,
    /// A numbered session.
    Id(SessionId),
}

impl SessionKey {
    /// Returns the numbered id, or `None` for the unset session.
    #[must_use]
    pub const fn id(self) -> Option<SessionId> {
        match self {
            Self::Unset => None,
            Self::Id(id) => Some(id),
        }
    }
}

impl From<SessionId> for SessionKey {
    fn from(id: SessionId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for SessionKey {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SessionId>() {
            Ok(id) => Ok(Self::Id(id)),
            Err(SessionIdError::Unset) => Ok(Self::Unset),
            Err(error) => Err(error),
        }
    }
}

impl Serialize for SessionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::Id(id) => id.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SessionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SessionKeyVisitor)
    }
}

/// Like [`SessionIdVisitor`], but placeholders and `null` map to
/// [`SessionKey::Unset`].
struct SessionKeyVisitor;

impl Visitor<'_> for SessionKeyVisitor {
    type Value = SessionKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a session id between 0 and 255, or an unset placeholder")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        SessionIdVisitor.visit_u64(v).map(SessionKey::Id)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        SessionIdVisitor.visit_i64(v).map(SessionKey::Id)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(SessionKey::Unset)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(SessionKey::Unset)
    }
}

/// Client-generated identity of one participant.
///
/// Stable for the lifetime of a browser tab. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err("client id must not be empty");
        }
        Ok(Self(value))
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl From<&str> for ClientId {
    /// Test and server-side construction; wire input goes through
    /// [`TryFrom<String>`].
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("5".parse::<SessionId>(), Ok(SessionId::new(5)));
        assert_eq!("255".parse::<SessionId>(), Ok(SessionId::new(255)));
    }

    #[test]
    fn rejects_unset_placeholders() {
        for raw in ["", "undefined", "null", "  "] {
            assert_eq!(raw.parse::<SessionId>(), Err(SessionIdError::Unset));
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            "256".parse::<SessionId>(),
            Err(SessionIdError::OutOfRange(_))
        ));
        assert!(matches!(
            "lobby".parse::<SessionId>(),
            Err(SessionIdError::OutOfRange(_))
        ));
    }

    #[test]
    fn deserializes_from_string_or_number() {
        let Ok(from_str) = serde_json::from_str::<SessionId>("\"7\"") else {
            panic!("string form should parse");
        };
        let Ok(from_num) = serde_json::from_str::<SessionId>("7") else {
            panic!("numeric form should parse");
        };
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<SessionId>("300").is_err());
        assert!(serde_json::from_str::<SessionId>("-1").is_err());
        assert!(serde_json::from_str::<SessionId>("null").is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&SessionId::new(3)).ok();
        assert_eq!(json.as_deref(), Some("\"3\""));
    }

    #[test]
    fn works_as_json_map_key() {
        let Ok(map) =
            serde_json::from_str::<std::collections::BTreeMap<SessionId, usize>>(r#"{"5":2}"#)
        else {
            panic!("map should parse");
        };
        assert_eq!(map.get(&SessionId::new(5)), Some(&2));
    }

    #[test]
    fn session_key_maps_placeholders_to_unset() {
        for raw in [r#""""#, r#""undefined""#, r#""null""#, "null"] {
            let Ok(key) = serde_json::from_str::<SessionKey>(raw) else {
                panic!("{raw} should decode as unset");
            };
            assert_eq!(key, SessionKey::Unset);
        }
        let Ok(key) = serde_json::from_str::<SessionKey>("9") else {
            panic!("numeric form should parse");
        };
        assert_eq!(key.id(), Some(SessionId::new(9)));
        assert!(serde_json::from_str::<SessionKey>(r#""lobby""#).is_err());
        assert!(serde_json::from_str::<SessionKey>("256").is_err());
    }

    #[test]
    fn empty_client_id_is_rejected() {
        assert!(serde_json::from_str::<ClientId>("\"\"").is_err());
        let Ok(id) = serde_json::from_str::<ClientId>("\"a1\"") else {
            panic!("client id should parse");
        };
        assert_eq!(id.as_str(), "a1");
    }
}
