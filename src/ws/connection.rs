//! WebSocket connection loop.
//!
//! Each socket gets its own task. It decodes inbound frames, forwards them
//! to the relay task in arrival order, and drains the connection's outbound
//! queue onto the socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::codec::{Frame, OutboundFrame};
use crate::domain::ConnectionId;
use crate::service::RelayHandle;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Decodes client frames and hands them to the relay task.
/// - Writes frames queued by the relay task to the socket.
/// - Reports the close to the relay task exactly once on exit.
pub async fn run_connection(socket: WebSocket, relay: RelayHandle, outbound_capacity: usize) {
    let connection = ConnectionId::new();
    let (outbound_tx, mut outbound_rx) = mpsc::channel(outbound_capacity.max(1));
    if relay.connect(connection, outbound_tx).await.is_err() {
        tracing::warn!(connection_id = %connection, "relay unavailable, dropping connection");
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                let decoded = match msg {
                    Some(Ok(Message::Text(text))) => Frame::decode(text.as_str().as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => Frame::decode(&bytes),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                    Some(Err(error)) => {
                        tracing::debug!(connection_id = %connection, %error, "websocket read failed");
                        break;
                    }
                };
                match decoded {
                    Ok(frame) => {
                        if relay.dispatch(connection, frame).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(connection_id = %connection, %error, "dropping malformed frame");
                    }
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(frame) = outbound else {
                    break;
                };
                let message = match frame {
                    OutboundFrame::Text(text) => Message::text(text.to_string()),
                    OutboundFrame::Binary(bytes) => Message::binary(bytes.to_vec()),
                };
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
        }
    }

    if relay.disconnect(connection).await.is_err() {
        tracing::debug!(connection_id = %connection, "relay gone before close was reported");
    }
    tracing::debug!(connection_id = %connection, "ws connection closed");
}
