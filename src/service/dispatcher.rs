//! Per-connection message handling.
//!
//! [`Dispatcher`] owns the [`SessionStore`] and the [`ConnectionRegistry`].
//! It is driven by exactly one task (see [`super::relay`]), so each call
//! below runs to completion before the next message from any connection is
//! looked at.
//!
//! Connection lifecycle:
//!
//! ```text
//! UNBOUND --INITIALIZE / GAME_STATE--> BOUND(session, client) --close--> CLOSED
//!    |                                                                    ^
//!    +------------------------------close---------------------------------+
//! ```

use crate::codec::{ControlFrame, DataFrame, Frame, OutboundFrame, StateUpdate, format_bits};
use chrono::Utc;

use crate::domain::{
    Binding, ClientId, ConnectionId, ConnectionRegistry, ConnectionState, OutboundSender,
    SessionDirectory, SessionKey, SessionStore, Upsert,
};
use crate::error::RelayError;

use super::broadcast;

/// Largest member count a binary `SESSION_LIST` can report.
pub const MAX_MEMBERS_PER_SESSION: usize = u8::MAX as usize;

/// Which encoding family a directory reply uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Binary,
    Json,
}

/// Routes decoded frames to session store mutations and broadcasts.
#[derive(Debug)]
pub struct Dispatcher {
    store: SessionStore,
    connections: ConnectionRegistry,
    max_members_per_session: usize,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty store.
    ///
    /// `max_members_per_session` is clamped to
    /// [`MAX_MEMBERS_PER_SESSION`].
    #[must_use]
    pub fn new(max_members_per_session: usize) -> Self {
        Self {
            store: SessionStore::new(),
            connections: ConnectionRegistry::new(),
            max_members_per_session: max_members_per_session.min(MAX_MEMBERS_PER_SESSION),
        }
    }

    /// Returns the session store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Returns the connection registry.
    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Returns the current session directory.
    #[must_use]
    pub fn list_sessions(&self) -> SessionDirectory {
        self.store.list_sessions()
    }

    /// Registers a new connection in the `UNBOUND` state.
    pub fn connect(&mut self, connection: ConnectionId, outbound: OutboundSender) {
        self.connections.register(connection, outbound);
        tracing::info!(connection_id = %connection, "client connected");
    }

    /// Handles one decoded frame from `connection`.
    pub fn dispatch(&mut self, connection: ConnectionId, frame: Frame) {
        tracing::debug!(connection_id = %connection, frame_type = frame.type_name(), "dispatching frame");
        match frame {
            Frame::Control(ControlFrame::FetchSessions) => {
                self.reply_directory(connection, Encoding::Binary);
            }
            Frame::Data(DataFrame::FetchSessions) => {
                self.reply_directory(connection, Encoding::Json);
            }
            Frame::Data(DataFrame::Initialize(update) | DataFrame::GameState(update)) => {
                self.handle_state_update(connection, update);
            }
            Frame::Control(ControlFrame::SessionList(_))
            | Frame::Data(
                DataFrame::AllSnakes { .. }
                | DataFrame::Disconnect { .. }
                | DataFrame::SessionList { .. }
                | DataFrame::Unknown,
            ) => {}
        }
    }

    /// Handles a transport close. Closing an unknown connection is a no-op.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(entry) = self.connections.remove(connection) else {
            return;
        };
        if let Some(binding) = entry.binding() {
            self.leave(connection, binding);
        }
        let connected_secs = (Utc::now() - entry.connected_at).num_seconds();
        tracing::info!(connection_id = %connection, connected_secs, "client disconnected");
    }

    fn handle_state_update(&mut self, connection: ConnectionId, update: StateUpdate) {
        let binding = Binding {
            session_id: update.session_id,
            client_id: update.client_id.clone(),
        };
        let result = match self.connections.state(connection) {
            ConnectionState::Closed => {
                tracing::debug!(connection_id = %connection, "frame from closed connection");
                Ok(())
            }
            ConnectionState::Bound(current) if current == binding => {
                self.update(connection, update)
            }
            ConnectionState::Bound(current) => self.rebind(connection, &current, update, binding),
            ConnectionState::Unbound => self.join(connection, update, binding),
        };
        if let Err(error) = result {
            tracing::warn!(connection_id = %connection, %error, "state update rejected");
        }
    }

    /// A bound connection reported a different identity. Leaves the old one
    /// only once the new session is known to have room, so a rejected rebind
    /// keeps the connection on its current member.
    fn rebind(
        &mut self,
        connection: ConnectionId,
        current: &Binding,
        update: StateUpdate,
        binding: Binding,
    ) -> Result<(), RelayError> {
        let vacating = self.routes_through(current, connection).then_some(current);
        self.check_capacity(&binding, vacating)?;
        tracing::info!(
            connection_id = %connection,
            from_session = %current.session_id,
            to_session = %binding.session_id,
            "connection rebinding"
        );
        self.leave(connection, current);
        self.join(connection, update, binding)
    }

    /// First message for an identity: bind, upsert, reply privately, then
    /// tell everyone else.
    ///
    /// The private `ALL_SNAKES` is taken after the upsert, so the joiner sees
    /// its own snake alongside the members already present.
    fn join(
        &mut self,
        connection: ConnectionId,
        update: StateUpdate,
        binding: Binding,
    ) -> Result<(), RelayError> {
        let StateUpdate {
            session_id,
            client_id,
            snake_info,
        } = update;
        self.check_capacity(&binding, None)?;

        let outcome = self
            .store
            .upsert_member(session_id, client_id.clone(), snake_info, connection);
        self.connections.bind(connection, binding);
        log_upsert(outcome, &session_id, &client_id);

        if let Some(frame) = broadcast::all_snakes(&self.store, session_id) {
            broadcast::send_private(&self.connections, connection, frame.clone());
            broadcast::broadcast(
                &self.store,
                &self.connections,
                session_id,
                &frame,
                Some(&client_id),
            );
        }
        Ok(())
    }

    /// Subsequent update from a bound connection: upsert and echo the full
    /// snapshot to every member, sender included.
    fn update(&mut self, connection: ConnectionId, update: StateUpdate) -> Result<(), RelayError> {
        let StateUpdate {
            session_id,
            client_id,
            snake_info,
        } = update;
        // The member may have been evicted by its original connection closing.
        self.check_capacity(
            &Binding {
                session_id,
                client_id: client_id.clone(),
            },
            None,
        )?;

        let outcome = self
            .store
            .upsert_member(session_id, client_id.clone(), snake_info, connection);
        if outcome != Upsert::Updated {
            log_upsert(outcome, &session_id, &client_id);
        }

        if let Some(frame) = broadcast::all_snakes(&self.store, session_id) {
            broadcast::broadcast(&self.store, &self.connections, session_id, &frame, None);
        }
        Ok(())
    }

    /// Drops `binding`'s member if it is still routed through `connection`
    /// and announces the departure.
    fn leave(&mut self, connection: ConnectionId, binding: &Binding) {
        let Binding {
            session_id,
            client_id,
        } = binding;
        if !self.routes_through(binding, connection) {
            tracing::debug!(
                connection_id = %connection,
                session_id = %session_id,
                client_id = %client_id,
                "member is routed through another connection, keeping it"
            );
            return;
        }

        let Some(removal) = self.store.remove_member(*session_id, client_id) else {
            return;
        };
        let member_secs = (Utc::now() - removal.member.joined_at).num_seconds();
        tracing::info!(
            session_id = %session_id,
            client_id = %client_id,
            member_secs,
            "client left session"
        );
        if removal.session_closed {
            tracing::info!(session_id = %session_id, "session is empty and was deleted");
            return;
        }
        broadcast::broadcast_disconnection(&self.store, &self.connections, *session_id, client_id);
    }

    fn routes_through(&self, binding: &Binding, connection: ConnectionId) -> bool {
        self.store
            .member(binding.session_id, &binding.client_id)
            .is_some_and(|member| member.connection == connection)
    }

    /// Rejects a binding that would add a member to a full session.
    /// `vacating` is a member about to leave, which frees its slot when it
    /// sits in the same session.
    fn check_capacity(
        &self,
        binding: &Binding,
        vacating: Option<&Binding>,
    ) -> Result<(), RelayError> {
        if self
            .store
            .member(binding.session_id, &binding.client_id)
            .is_some()
        {
            return Ok(());
        }
        let freed = vacating.is_some_and(|left| left.session_id == binding.session_id);
        let occupied = self
            .store
            .member_count(binding.session_id)
            .saturating_sub(usize::from(freed));
        if occupied >= self.max_members_per_session {
            return Err(RelayError::SessionFull {
                session_id: binding.session_id,
                capacity: self.max_members_per_session,
            });
        }
        Ok(())
    }

    fn reply_directory(&self, connection: ConnectionId, encoding: Encoding) {
        let sessions = self.store.list_sessions();
        let encoded = match encoding {
            Encoding::Binary => ControlFrame::SessionList(sessions)
                .encode()
                .map(|bytes| {
                    tracing::debug!(connection_id = %connection, bits = %format_bits(&bytes), "sending binary SESSION_LIST");
                    OutboundFrame::binary(bytes)
                }),
            Encoding::Json => DataFrame::SessionList { sessions }
                .to_json()
                .map(OutboundFrame::text),
        };
        match encoded {
            Ok(frame) => {
                broadcast::send_private(&self.connections, connection, frame);
            }
            Err(error) => {
                tracing::warn!(connection_id = %connection, %error, "failed to encode SESSION_LIST");
            }
        }
    }
}

fn log_upsert(outcome: Upsert, session_id: &SessionKey, client_id: &ClientId) {
    match outcome {
        Upsert::Inserted {
            session_created: true,
        } => {
            tracing::info!(session_id = %session_id, client_id = %client_id, "session created");
        }
        Upsert::Inserted {
            session_created: false,
        } => {
            tracing::info!(session_id = %session_id, client_id = %client_id, "client joined session");
        }
        Upsert::Updated => {
            tracing::debug!(session_id = %session_id, client_id = %client_id, "client rejoined with existing member");
        }
    }
}
