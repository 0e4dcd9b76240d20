//! End-to-end tests: a real server on an ephemeral port, driven over
//! WebSocket and HTTP.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use snake_relay::app_state::AppState;
use snake_relay::build_app;
use snake_relay::service::{Dispatcher, MAX_MEMBERS_PER_SESSION, RelayHandle};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let (relay, _task) = RelayHandle::spawn(Dispatcher::new(MAX_MEMBERS_PER_SESSION), 64);
    let app = build_app(AppState {
        relay,
        outbound_capacity: 32,
        max_frame_bytes: 64 * 1024,
    });
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let Ok((stream, _)) = connect_async(format!("ws://{addr}/")).await else {
        panic!("websocket connect failed");
    };
    stream
}

async fn send_json(client: &mut Client, value: Value) {
    if client.send(Message::text(value.to_string())).await.is_err() {
        panic!("send failed");
    }
}

async fn recv(client: &mut Client) -> Message {
    loop {
        let Ok(next) = tokio::time::timeout(RECV_TIMEOUT, client.next()).await else {
            panic!("timed out waiting for a frame");
        };
        let Some(Ok(message)) = next else {
            panic!("connection ended");
        };
        if message.is_text() || message.is_binary() {
            return message;
        }
    }
}

async fn recv_json(client: &mut Client) -> Value {
    let message = recv(client).await;
    let Ok(value) = serde_json::from_slice(&message.into_data()) else {
        panic!("expected a JSON frame");
    };
    value
}

fn join(kind: &str, session: &str, client: &str, color: &str) -> Value {
    json!({
        "type": kind,
        "sessionId": session,
        "clientId": client,
        "snakeInfo": {"headColor": color},
    })
}

#[tokio::test]
async fn two_clients_join_update_and_leave() {
    let addr = start_server().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;

    send_json(&mut a, join("INITIALIZE", "3", "a1", "#a")).await;
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "ALL_SNAKES", "snakes": {"a1": {"headColor": "#a"}}})
    );

    send_json(&mut b, join("INITIALIZE", "3", "b2", "#b")).await;
    let both = json!({
        "type": "ALL_SNAKES",
        "snakes": {"a1": {"headColor": "#a"}, "b2": {"headColor": "#b"}},
    });
    assert_eq!(recv_json(&mut b).await, both);
    assert_eq!(recv_json(&mut a).await, both);

    send_json(&mut b, join("GAME_STATE", "3", "b2", "#c")).await;
    let updated = json!({
        "type": "ALL_SNAKES",
        "snakes": {"a1": {"headColor": "#a"}, "b2": {"headColor": "#c"}},
    });
    assert_eq!(recv_json(&mut a).await, updated);
    assert_eq!(recv_json(&mut b).await, updated);

    let _ = a.close(None).await;
    assert_eq!(
        recv_json(&mut b).await,
        json!({"type": "DISCONNECT", "clientId": "a1"})
    );

    if b.send(Message::binary(vec![0x00])).await.is_err() {
        panic!("send failed");
    }
    let reply = recv(&mut b).await;
    assert!(reply.is_binary());
    assert_eq!(reply.into_data().to_vec(), vec![0x20, 3, 1]);
}

#[tokio::test]
async fn directory_query_in_both_encodings() {
    let addr = start_server().await;
    let mut players = Vec::new();
    for (session, client) in [("5", "a"), ("5", "b"), ("7", "c")] {
        let mut player = connect(addr).await;
        send_json(&mut player, join("INITIALIZE", session, client, "#0")).await;
        let _ = recv_json(&mut player).await;
        players.push(player);
    }

    let mut lobby = connect(addr).await;
    if lobby.send(Message::binary(vec![0x00])).await.is_err() {
        panic!("send failed");
    }
    assert_eq!(recv(&mut lobby).await.into_data().to_vec(), vec![0x20, 5, 2, 7, 1]);

    send_json(&mut lobby, json!({"type": "FETCH_SESSIONS"})).await;
    assert_eq!(
        recv_json(&mut lobby).await,
        json!({"type": "SESSION_LIST", "sessions": {"5": 2, "7": 1}})
    );

    let Ok(response) = reqwest::get(format!("http://{addr}/api/v1/sessions")).await else {
        panic!("http request failed");
    };
    let Ok(body) = response.json::<Value>().await else {
        panic!("expected JSON body");
    };
    assert_eq!(
        body,
        json!({"sessions": {"5": 2, "7": 1}, "total_sessions": 2, "total_members": 3})
    );
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_connection() {
    let addr = start_server().await;
    let mut client = connect(addr).await;

    for junk in ["not json", "{\"type\":\"GAME_STATE\"}", "{\"type\":\"NOPE\"}"] {
        if client.send(Message::text(junk)).await.is_err() {
            panic!("send failed");
        }
    }
    if client.send(Message::binary(vec![0xE0])).await.is_err() {
        panic!("send failed");
    }

    send_json(&mut client, json!({"type": "FETCH_SESSIONS"})).await;
    assert_eq!(
        recv_json(&mut client).await,
        json!({"type": "SESSION_LIST", "sessions": {}})
    );
}
