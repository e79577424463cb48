//! End-to-end tests: a real server on a random port, driven by a
//! tokio-tungstenite client speaking the JSON envelope protocol.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use qiba::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = QibaServer::builder()
        .bind("127.0.0.1:0")
        .config(ServerConfig {
            seal_key: Some([3u8; 32]),
            ..ServerConfig::default()
        })
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Sends `request` under `seq` and returns the reply envelope.
async fn call(ws: &mut ClientWs, seq: u64, request: Request) -> Envelope {
    let envelope = Envelope {
        seq,
        timestamp: 0,
        payload: Payload::Request(request),
    };
    let text = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::text(text)).await.expect("send");
    recv(ws).await
}

async fn recv(ws: &mut ClientWs) -> Envelope {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("reply within 2s")
        .expect("stream open")
        .expect("frame ok");
    serde_json::from_slice(&msg.into_data()).expect("decode")
}

/// Unwraps a `Response` payload, failing the test on anything else.
fn response(envelope: Envelope) -> Response {
    match envelope.payload {
        Payload::Response(response) => response,
        other => panic!("expected Response, got {other:?}"),
    }
}

fn player(id: i64, name: &str) -> Profile {
    Profile {
        id: UserId(id),
        username: Some(name.into()),
        first_name: None,
        last_name: None,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_game_time_reply_echoes_seq() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = call(&mut ws, 41, Request::GameTime).await;

    assert_eq!(reply.seq, 41);
    assert!(reply.timestamp > 0);
    assert_eq!(response(reply), Response::GameTime { seconds: 10 });
}

#[tokio::test]
async fn test_full_session_over_websocket() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let can_play = call(&mut ws, 1, Request::CanPlay { user_id: UserId(7) }).await;
    assert_eq!(response(can_play), Response::CanPlay { allowed: true });

    let started = call(&mut ws, 2, Request::StartGame { user: player(7, "ada") }).await;
    let Response::GameStarted { session_id, sealed } = response(started) else {
        panic!("expected GameStarted");
    };
    assert!(!sealed.data.is_empty());
    assert!(!sealed.tag.is_empty());

    let spawned = call(&mut ws, 3, Request::Spawn { session_id }).await;
    let Response::Spawned { object } = response(spawned) else {
        panic!("expected Spawned");
    };

    let tapped = call(
        &mut ws,
        4,
        Request::Tap {
            session_id,
            object_id: object.id,
            timestamp: chrono::Utc::now(),
        },
    )
    .await;
    assert_eq!(response(tapped), Response::Tapped { accepted: true });

    let ended = call(&mut ws, 5, Request::EndGame { session_id }).await;
    let expected = match object.kind {
        ObjectKind::Reward => 1,
        ObjectKind::Penalty => -5,
    };
    assert_eq!(response(ended), Response::GameEnded { score: expected });

    let board = call(
        &mut ws,
        6,
        Request::Leaderboard {
            user_id: UserId(7),
            limit: Some(10),
        },
    )
    .await;
    let Response::Leaderboard { entries, user_entry } = response(board) else {
        panic!("expected Leaderboard");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].score, expected);
    assert_eq!(user_entry.map(|e| e.rank), Some(1));

    let again = call(&mut ws, 7, Request::CanPlay { user_id: UserId(7) }).await;
    assert_eq!(response(again), Response::CanPlay { allowed: false });
}

#[tokio::test]
async fn test_unknown_session_returns_error_404() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let reply = call(
        &mut ws,
        9,
        Request::EndGame {
            session_id: SessionId::new(),
        },
    )
    .await;

    assert_eq!(reply.seq, 9);
    match reply.payload {
        Payload::Error { code, message } => {
            assert_eq!(code, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("expected Error 404, got {other:?}"),
    }
}

#[tokio::test]
async fn test_response_payload_from_client_returns_error_400() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let envelope = Envelope {
        seq: 3,
        timestamp: 0,
        payload: Payload::Response(Response::UserAdded),
    };
    ws.send(Message::text(serde_json::to_string(&envelope).unwrap()))
        .await
        .unwrap();

    let reply = recv(&mut ws).await;
    assert_eq!(reply.seq, 3);
    assert!(matches!(reply.payload, Payload::Error { code: 400, .. }));
}

#[tokio::test]
async fn test_invalid_envelope_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("not json".to_owned())).await.expect("send");
    let reply = recv(&mut ws).await;
    assert_eq!(reply.seq, 0);
    assert!(matches!(reply.payload, Payload::Error { code: 400, .. }));

    let reply = call(&mut ws, 1, Request::GameTime).await;
    assert_eq!(response(reply), Response::GameTime { seconds: 10 });
}

#[tokio::test]
async fn test_referral_flow_over_websocket() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let registered = call(&mut ws, 1, Request::Referral { user: player(1, "ada") }).await;
    assert_eq!(response(registered), Response::ReferralRegistered);

    let invited = call(
        &mut ws,
        2,
        Request::Invite {
            from: UserId(1),
            to: UserId(2),
        },
    )
    .await;
    assert_eq!(response(invited), Response::Invited { recorded: true });

    for (seq, granted) in [(3, true), (4, false)] {
        let accepted = call(
            &mut ws,
            seq,
            Request::AcceptReferral {
                from: UserId(1),
                to: player(2, "grace"),
            },
        )
        .await;
        assert_eq!(response(accepted), Response::ReferralAccepted { granted });
    }

    let stats = call(&mut ws, 5, Request::ReferralStatistics { user_id: UserId(1) }).await;
    assert_eq!(
        response(stats),
        Response::ReferralStatistics {
            count: 1,
            bonus_count: 1
        }
    );
}

#[tokio::test]
async fn test_concurrent_sessions_all_reach_leaderboard() {
    let addr = start_server().await;

    let mut tasks = Vec::new();
    for id in 0..8 {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut ws = connect(&addr).await;
            let started =
                call(&mut ws, 1, Request::StartGame { user: player(id, "p") }).await;
            let Response::GameStarted { session_id, .. } = response(started) else {
                panic!("expected GameStarted");
            };
            call(&mut ws, 2, Request::EndGame { session_id }).await;
        }));
    }
    for task in tasks {
        task.await.expect("client task");
    }

    let mut ws = connect(&addr).await;
    let board = call(
        &mut ws,
        1,
        Request::Leaderboard {
            user_id: UserId(0),
            limit: None,
        },
    )
    .await;
    let Response::Leaderboard { entries, .. } = response(board) else {
        panic!("expected Leaderboard");
    };
    assert_eq!(entries.len(), 8);
}
