//! Domain layer: identifiers, session store, and connection registry.
//!
//! Everything here is plain owned state. The dispatcher task holds the only
//! [`SessionStore`] and [`ConnectionRegistry`] and mutates them one message
//! at a time.

pub mod connection_id;
pub mod connection_registry;
pub mod member;
pub mod session_id;
pub mod session_store;

pub use connection_id::ConnectionId;
pub use connection_registry::{Binding, ConnectionRegistry, ConnectionState, OutboundSender};
pub use member::{EntityState, Member};
pub use session_id::{ClientId, SessionId, SessionIdError, SessionKey};
pub use session_store::{SessionDirectory, SessionSnapshot, SessionStore, Upsert};
