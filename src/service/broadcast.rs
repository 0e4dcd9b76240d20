//! Session fan-out.
//!
//! Recipients are the current members of one session, resolved through
//! their [`ConnectionId`] back-references. Delivery is best effort: a
//! transport that is not ready is skipped and never retried. The next
//! periodic `GAME_STATE` resynchronises it.

use crate::codec::{DataFrame, OutboundFrame};
use crate::domain::{ClientId, ConnectionId, ConnectionRegistry, SessionKey, SessionStore};

/// Delivers `payload` to every member of `session_id` except
/// `exclude`. Returns the number of members the frame was queued for.
pub fn broadcast(
    store: &SessionStore,
    connections: &ConnectionRegistry,
    session_id: SessionKey,
    payload: &OutboundFrame,
    exclude: Option<&ClientId>,
) -> usize {
    let Some(session) = store.session(session_id) else {
        return 0;
    };
    let mut delivered = 0;
    for (client_id, member) in session.members() {
        if exclude == Some(client_id) {
            continue;
        }
        if connections.send(member.connection, payload.clone()) {
            delivered += 1;
        } else {
            tracing::debug!(
                session_id = %session_id,
                client_id = %client_id,
                "transport not ready, skipping"
            );
        }
    }
    delivered
}

/// Tells every remaining member of `session_id` that `client_id` left.
pub fn broadcast_disconnection(
    store: &SessionStore,
    connections: &ConnectionRegistry,
    session_id: SessionKey,
    client_id: &ClientId,
) -> usize {
    let frame = DataFrame::Disconnect {
        client_id: client_id.clone(),
    };
    match frame.to_json() {
        Ok(json) => broadcast(
            store,
            connections,
            session_id,
            &OutboundFrame::text(json),
            None,
        ),
        Err(error) => {
            tracing::warn!(%error, "failed to encode DISCONNECT");
            0
        }
    }
}

/// Builds the `ALL_SNAKES` frame for a session.
#[must_use]
pub fn all_snakes(store: &SessionStore, session_id: SessionKey) -> Option<OutboundFrame> {
    let frame = DataFrame::AllSnakes {
        snakes: store.snapshot(session_id),
    };
    match frame.to_json() {
        Ok(json) => Some(OutboundFrame::text(json)),
        Err(error) => {
            tracing::warn!(session_id = %session_id, %error, "failed to encode ALL_SNAKES");
            None
        }
    }
}

/// Sends a frame to a single connection. Returns `false` if it was skipped.
pub fn send_private(
    connections: &ConnectionRegistry,
    connection: ConnectionId,
    payload: OutboundFrame,
) -> bool {
    let sent = connections.send(connection, payload);
    if !sent {
        tracing::debug!(connection_id = %connection, "transport not ready, reply dropped");
    }
    sent
}
