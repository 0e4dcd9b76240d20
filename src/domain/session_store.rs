//! Session store: session key → member map.
//!
//! [`SessionStore`] is plain owned state with no interior locking. Exactly
//! one dispatcher task owns it and applies one message at a time, so every
//! operation here runs to completion before the next one starts.
//!
//! Sessions are materialised lazily by [`SessionStore::upsert_member`] and
//! dropped the moment their last member leaves.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use super::{ClientId, ConnectionId, EntityState, Member, SessionId, SessionKey};

/// Snapshot of every live session and its member count, ordered by id.
pub type SessionDirectory = BTreeMap<SessionId, usize>;

/// Entity states of a session keyed by client, with routing data stripped.
pub type SessionSnapshot = BTreeMap<ClientId, EntityState>;

/// The members of one session.
#[derive(Debug, Default)]
pub struct Session {
    members: HashMap<ClientId, Member>,
}

impl Session {
    /// Returns the member for `client_id`, if present.
    #[must_use]
    pub fn member(&self, client_id: &ClientId) -> Option<&Member> {
        self.members.get(client_id)
    }

    /// Iterates over all members.
    pub fn members(&self) -> impl Iterator<Item = (&ClientId, &Member)> {
        self.members.iter()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the session has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Outcome of [`SessionStore::upsert_member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new member was inserted. `session_created` is set when the session
    /// itself did not exist before.
    Inserted {
        /// Whether this insert materialised the session.
        session_created: bool,
    },
    /// An existing member's state was replaced; its connection was kept.
    Updated,
}

/// A member removed by [`SessionStore::remove_member`].
#[derive(Debug, Clone)]
pub struct Removal {
    /// The removed record.
    pub member: Member,
    /// Whether the session was deleted because it became empty.
    pub session_closed: bool,
}

/// Process-wide mapping from session key to members.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: BTreeMap<SessionKey, Session>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `session_id`, creating it empty if absent.
    ///
    /// Callers must put a member into a freshly created session before
    /// returning control, otherwise an empty session would outlive the
    /// event that created it.
    pub fn ensure_session(&mut self, session_id: SessionKey) -> &mut Session {
        self.sessions.entry(session_id).or_default()
    }

    /// Inserts or updates a member.
    ///
    /// An absent client is inserted bound to `connection`. A present client
    /// gets its state replaced and keeps its existing connection.
    pub fn upsert_member(
        &mut self,
        session_id: SessionKey,
        client_id: ClientId,
        state: EntityState,
        connection: ConnectionId,
    ) -> Upsert {
        let session_created = !self.sessions.contains_key(&session_id);
        let session = self.ensure_session(session_id);
        match session.members.get_mut(&client_id) {
            Some(member) => {
                member.replace_state(state);
                Upsert::Updated
            }
            None => {
                session
                    .members
                    .insert(client_id, Member::new(state, connection));
                Upsert::Inserted { session_created }
            }
        }
    }

    /// Removes a member, deleting the session if it becomes empty.
    ///
    /// Removing an absent member is a no-op and returns `None`.
    pub fn remove_member(
        &mut self,
        session_id: SessionKey,
        client_id: &ClientId,
    ) -> Option<Removal> {
        let Entry::Occupied(mut entry) = self.sessions.entry(session_id) else {
            return None;
        };
        let member = entry.get_mut().members.remove(client_id)?;
        let session_closed = entry.get().is_empty();
        if session_closed {
            entry.remove();
        }
        Some(Removal {
            member,
            session_closed,
        })
    }

    /// Returns every non-empty numbered session with its member count.
    ///
    /// The unset session is live but never advertised.
    #[must_use]
    pub fn list_sessions(&self) -> SessionDirectory {
        self.sessions
            .iter()
            .filter(|(_, session)| !session.is_empty())
            .filter_map(|(key, session)| Some((key.id()?, session.len())))
            .collect()
    }

    /// Returns the entity states of every member of a session. An unknown
    /// session yields an empty snapshot.
    #[must_use]
    pub fn snapshot(&self, session_id: SessionKey) -> SessionSnapshot {
        self.sessions
            .get(&session_id)
            .map(|session| {
                session
                    .members()
                    .map(|(client_id, member)| (client_id.clone(), member.state.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns a session, if it exists.
    #[must_use]
    pub fn session(&self, session_id: SessionKey) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    /// Returns a single member, if present.
    #[must_use]
    pub fn member(&self, session_id: SessionKey, client_id: &ClientId) -> Option<&Member> {
        self.sessions.get(&session_id)?.member(client_id)
    }

    /// Returns the member count of a session (0 if absent).
    #[must_use]
    pub fn member_count(&self, session_id: SessionKey) -> usize {
        self.sessions.get(&session_id).map_or(0, Session::len)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
