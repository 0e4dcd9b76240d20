//! The relay task and its command queue.
//!
//! [`RelayHandle`] is the cloneable front door every connection task and
//! HTTP handler holds. Commands go through one bounded `mpsc` queue into a
//! single task that owns the [`Dispatcher`], which gives single-message
//! atomicity without any lock around the session store.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::Dispatcher;
use crate::codec::Frame;
use crate::domain::{ConnectionId, OutboundSender, SessionDirectory};
use crate::error::RelayError;

/// A unit of work for the relay task.
#[derive(Debug)]
pub enum RelayCommand {
    /// A socket was upgraded.
    Connect {
        /// New connection.
        connection: ConnectionId,
        /// Its outbound queue.
        outbound: OutboundSender,
    },
    /// A decoded frame arrived.
    Frame {
        /// Originating connection.
        connection: ConnectionId,
        /// The frame.
        frame: Frame,
    },
    /// A socket closed.
    Disconnect {
        /// Closed connection.
        connection: ConnectionId,
    },
    /// Directory query from outside the WebSocket protocol.
    ListSessions {
        /// Where to send the answer.
        reply: oneshot::Sender<SessionDirectory>,
    },
}

/// Cloneable handle to the relay task.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Spawns the relay task around `dispatcher`.
    ///
    /// The task exits once every handle has been dropped.
    #[must_use]
    pub fn spawn(dispatcher: Dispatcher, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run(dispatcher, receiver));
        (Self { sender }, task)
    }

    /// Registers a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DispatcherUnavailable`] if the relay task has
    /// stopped.
    pub async fn connect(
        &self,
        connection: ConnectionId,
        outbound: OutboundSender,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Connect {
            connection,
            outbound,
        })
        .await
    }

    /// Forwards a decoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DispatcherUnavailable`] if the relay task has
    /// stopped.
    pub async fn dispatch(&self, connection: ConnectionId, frame: Frame) -> Result<(), RelayError> {
        self.send(RelayCommand::Frame { connection, frame }).await
    }

    /// Reports a closed connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DispatcherUnavailable`] if the relay task has
    /// stopped.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), RelayError> {
        self.send(RelayCommand::Disconnect { connection }).await
    }

    /// Asks the relay task for the current session directory.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DispatcherUnavailable`] if the relay task has
    /// stopped or dropped the request.
    pub async fn list_sessions(&self) -> Result<SessionDirectory, RelayError> {
        let (reply, answer) = oneshot::channel();
        self.send(RelayCommand::ListSessions { reply }).await?;
        answer.await.map_err(|_| RelayError::DispatcherUnavailable)
    }

    async fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RelayError::DispatcherUnavailable)
    }
}

async fn run(mut dispatcher: Dispatcher, mut receiver: mpsc::Receiver<RelayCommand>) {
    tracing::debug!("relay task started");
    while let Some(command) = receiver.recv().await {
        match command {
            RelayCommand::Connect {
                connection,
                outbound,
            } => dispatcher.connect(connection, outbound),
            RelayCommand::Frame { connection, frame } => dispatcher.dispatch(connection, frame),
            RelayCommand::Disconnect { connection } => dispatcher.disconnect(connection),
            RelayCommand::ListSessions { reply } => {
                let _ = reply.send(dispatcher.list_sessions());
            }
        }
    }
    tracing::debug!("relay task stopped");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::codec::{ControlFrame, DataFrame, OutboundFrame};
    use crate::domain::SessionId;
    use crate::service::dispatcher::MAX_MEMBERS_PER_SESSION;

    fn join_frame(session: &str, client: &str) -> Frame {
        let text = serde_json::json!({
            "type": "INITIALIZE",
            "sessionId": session,
            "clientId": client,
            "snakeInfo": {},
        })
        .to_string();
        let Ok(frame) = Frame::decode(text.as_bytes()) else {
            panic!("test frame should decode");
        };
        frame
    }

    #[tokio::test]
    async fn commands_are_applied_in_order() {
        let (relay, _task) = RelayHandle::spawn(Dispatcher::new(MAX_MEMBERS_PER_SESSION), 16);
        let connection = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(8);

        assert_ok!(relay.connect(connection, tx).await);
        assert_ok!(relay.dispatch(connection, join_frame("5", "a")).await);

        let Ok(sessions) = relay.list_sessions().await else {
            panic!("relay should answer");
        };
        assert_eq!(sessions.get(&SessionId::new(5)), Some(&1));

        let Some(OutboundFrame::Text(snapshot)) = rx.recv().await else {
            panic!("expected ALL_SNAKES");
        };
        assert!(snapshot.contains("ALL_SNAKES"));

        assert_ok!(relay.disconnect(connection).await);
        let Ok(sessions) = relay.list_sessions().await else {
            panic!("relay should answer");
        };
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn binary_fetch_is_answered_in_binary() {
        let (relay, _task) = RelayHandle::spawn(Dispatcher::new(MAX_MEMBERS_PER_SESSION), 16);
        let connection = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        assert_ok!(relay.connect(connection, tx).await);
        assert_ok!(
            relay
                .dispatch(connection, Frame::Control(ControlFrame::FetchSessions))
                .await
        );
        assert_eq!(rx.recv().await, Some(OutboundFrame::binary(vec![0x20])));

        assert_ok!(
            relay
                .dispatch(connection, Frame::Data(DataFrame::FetchSessions))
                .await
        );
        assert_eq!(
            rx.recv().await,
            Some(OutboundFrame::text(r#"{"type":"SESSION_LIST","sessions":{}}"#))
        );
    }

    #[tokio::test]
    async fn stopped_task_reports_unavailable() {
        let (relay, task) = RelayHandle::spawn(Dispatcher::new(MAX_MEMBERS_PER_SESSION), 1);
        task.abort();
        let _ = task.await;
        assert!(matches!(
            relay.list_sessions().await,
            Err(RelayError::DispatcherUnavailable)
        ));
    }
}
