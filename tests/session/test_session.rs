//! Tests for `SessionManager`
//!
//! Drives the session against the in-memory backend with tokio's paused
//! clock, so backoff and debounce windows elapse deterministically.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kodegen_coach_client::protocol::{
    Ack, ContentUpdate, Envelope, HintLevelUpdate, InboundKind, InboundMessage, OutboundMessage,
    PathRef, RestoreRequest, SaveFile, ServerError, Welcome,
};
use kodegen_coach_client::transport::{MemoryServer, ServerConnection, memory_pair};
use kodegen_coach_client::{
    CoachOptions, ConnectionState, DeliveryState, MessageBus, SessionId, SessionManager,
};
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tokio_test::{assert_err, assert_ok};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn content(file: &str, body: &str) -> OutboundMessage {
    OutboundMessage::ContentUpdate(ContentUpdate {
        file: file.to_string(),
        content: body.to_string(),
    })
}

fn save(file: &str) -> OutboundMessage {
    OutboundMessage::Save(SaveFile {
        file: file.to_string(),
        content: "fn main() { println!(\"saved\"); }".to_string(),
    })
}

/// Let the driver task drain its command queue
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

/// Accept the next connection and complete the handshake
async fn handshake(server: &mut MemoryServer, session_id: &str) -> ServerConnection {
    let mut conn = server.accept().await.expect("client should connect");
    let hello = conn.recv().await.expect("client should say hello");
    assert_eq!(hello.kind, "session:hello");
    assert!(conn.welcome(session_id));
    conn
}

async fn connected(options: CoachOptions) -> (SessionManager, MemoryServer, ServerConnection) {
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, options, MessageBus::new());
    session.connect();
    let conn = handshake(&mut server, "s-1").await;
    session
        .wait_for_state(ConnectionState::Active)
        .await
        .expect("session should activate");
    (session, server, conn)
}

fn file_of(envelope: &Envelope) -> String {
    envelope.payload["file"].as_str().unwrap_or_default().to_string()
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_reaches_active() {
    init_logger();
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    assert_eq!(session.status().state, ConnectionState::Disconnected);

    let mut states = session.watch_status();
    session.connect();

    let mut conn = server.accept().await.unwrap();
    assert_eq!(conn.recv().await.unwrap().kind, "session:hello");
    assert_eq!(session.status().state, ConnectionState::Handshaking);

    conn.welcome("s-42");
    let status = states
        .wait_for(|s| s.state == ConnectionState::Active)
        .await
        .unwrap()
        .clone();
    assert_eq!(status.session_id, Some(SessionId::new("s-42")));
    assert_eq!(status.reconnect_attempt, 0);
    assert!(status.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent() {
    let (session, mut server, _conn) = connected(CoachOptions::default()).await;

    session.connect();
    session.connect();
    settle().await;

    assert!(server.try_accept().is_none());
    assert_eq!(server.connection_attempts(), 1);
    assert_eq!(session.status().state, ConnectionState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_counter_and_backoff_schedule() {
    init_logger();
    let (transport, mut server) = memory_pair();
    server.refuse_connections(true);
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    let mut status = session.watch_status();

    let start = Instant::now();
    session.connect();

    let mut attempts = Vec::new();
    let mut offsets = Vec::new();
    let mut notices = Vec::new();
    while attempts.len() < 7 {
        status.changed().await.unwrap();
        let current = status.borrow_and_update().clone();
        if current.state == ConnectionState::Reconnecting
            && attempts.last() != Some(&current.reconnect_attempt)
        {
            attempts.push(current.reconnect_attempt);
            offsets.push(start.elapsed().as_secs());
            notices.push(current.show_reconnect_notice());
        }
    }

    assert_eq!(attempts, vec![1, 2, 3, 4, 5, 6, 7]);
    // Retries fire after 1, 2, 4, 8, 16, 30 seconds
    assert_eq!(offsets, vec![0, 1, 3, 7, 15, 31, 61]);
    assert_eq!(notices, vec![false, false, false, false, true, true, true]);

    // Backend comes back; an explicit connect skips the remaining wait
    server.refuse_connections(false);
    session.connect();
    let _conn = handshake(&mut server, "s-1").await;
    let active = session.wait_for_state(ConnectionState::Active).await.unwrap();
    assert_eq!(active.reconnect_attempt, 0);
    assert!(!active.show_reconnect_notice());
    assert!(start.elapsed() < Duration::from_secs(62));
}

#[tokio::test(start_paused = true)]
async fn test_debounced_burst_sends_last_payload_per_key() {
    init_logger();
    let (session, _server, mut conn) = connected(CoachOptions::default()).await;

    for step in 0..5 {
        session.send(content("a.rs", &format!("a{step}")));
        session.send(content("b.rs", &format!("b{step}")));
        sleep(Duration::from_millis(50)).await;
    }

    let first = conn.recv().await.unwrap();
    let second = conn.recv().await.unwrap();
    for envelope in [&first, &second] {
        assert_eq!(envelope.kind, "editor:content_update");
    }
    assert_eq!(file_of(&first), "a.rs");
    assert_eq!(first.payload["content"], "a4");
    assert_eq!(file_of(&second), "b.rs");
    assert_eq!(second.payload["content"], "b4");

    sleep(Duration::from_secs(2)).await;
    assert!(conn.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_max_wait_flushes_continuous_typing() {
    let (session, _server, mut conn) = connected(CoachOptions::default()).await;
    let start = Instant::now();

    // One keystroke every 240 ms never leaves a 300 ms quiet gap
    for step in 0..=22 {
        session.send(content("a.rs", &step.to_string()));
        sleep(Duration::from_millis(240)).await;
    }

    let capped = conn.try_recv().expect("max-wait should have forced a flush");
    assert_eq!(capped.payload["content"], "20");
    assert!(conn.try_recv().is_none());

    let trailing = conn.recv().await.unwrap();
    assert_eq!(trailing.payload["content"], "22");
    assert_eq!(start.elapsed(), Duration::from_millis(5580));
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_save_replays_before_new_edits() {
    init_logger();
    let (session, mut server, mut conn) = connected(CoachOptions::default()).await;

    let operation_id = session.send(save("src/main.rs")).expect("saves are mutations");
    let written = conn.recv().await.unwrap();
    assert_eq!(written.kind, "editor:save");
    assert_eq!(written.id.as_deref(), Some(operation_id.as_str()));
    assert!(session.interrupted_operations().is_empty());

    // Connection drops before the ack
    drop(conn);
    session
        .wait_for_state(ConnectionState::Reconnecting)
        .await
        .unwrap();
    let interrupted = session.interrupted_operations();
    assert_eq!(interrupted.len(), 1);
    assert_eq!(interrupted[0].operation_id, operation_id);
    assert_eq!(interrupted[0].state, DeliveryState::Retrying);

    // The user keeps typing during the outage
    session.send(content("src/main.rs", "fn main() { todo!() }"));

    let mut conn = handshake(&mut server, "s-2").await;

    let restore = conn.recv().await.unwrap();
    assert_eq!(restore.kind, "session:restore");
    let request: RestoreRequest = restore.payload_as().unwrap();
    assert_eq!(request.session_id, Some(SessionId::new("s-1")));

    let replayed = conn.recv().await.unwrap();
    assert_eq!(replayed.kind, "editor:save");
    assert_eq!(replayed.id.as_deref(), Some(operation_id.as_str()));
    assert_eq!(replayed.payload, written.payload);

    let edit = conn.recv().await.unwrap();
    assert_eq!(edit.kind, "editor:content_update");

    // Notice stays until the backend confirms
    assert_eq!(session.interrupted_operations().len(), 1);
    conn.send(&InboundMessage::Ack(Ack {
        operation_id: operation_id.clone(),
    }));
    settle().await;
    assert!(session.interrupted_operations().is_empty());
    assert!(session.pending_operations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_save_replays_once_per_connection() {
    init_logger();
    let (session, mut server, mut conn) = connected(CoachOptions::default()).await;
    let operation_id = session.send(save("src/lib.rs")).expect("saves are mutations");
    assert_eq!(conn.recv().await.unwrap().kind, "editor:save");

    for (previous, next) in [("s-1", "s-2"), ("s-2", "s-3")] {
        drop(conn);
        session
            .wait_for_state(ConnectionState::Reconnecting)
            .await
            .unwrap();
        assert_eq!(session.interrupted_operations().len(), 1);

        conn = handshake(&mut server, next).await;
        let restore = conn.recv().await.unwrap();
        assert_eq!(restore.kind, "session:restore");
        let request: RestoreRequest = restore.payload_as().unwrap();
        assert_eq!(request.session_id, Some(SessionId::new(previous)));

        let replayed = conn.recv().await.unwrap();
        assert_eq!(replayed.kind, "editor:save");
        assert_eq!(replayed.id.as_deref(), Some(operation_id.as_str()));

        settle().await;
        assert!(conn.try_recv().is_none());
        assert_eq!(session.pending_operations().len(), 1);
    }

    conn.send(&InboundMessage::Ack(Ack {
        operation_id: operation_id.clone(),
    }));
    settle().await;
    assert!(session.pending_operations().is_empty());
    assert!(session.interrupted_operations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mutations_queue_while_disconnected() {
    let (transport, mut server) = memory_pair();
    let options = CoachOptions::builder().max_pending_operations(2).build();
    let session = SessionManager::new(transport, options, MessageBus::new());

    let dropped = session.send(OutboundMessage::FileCreate(PathRef {
        path: "a.rs".to_string(),
    }));
    let kept_first = session.send(save("b.rs"));
    let kept_second = session.send(save("c.rs"));
    session.send(OutboundMessage::Ping {});
    settle().await;

    let pending = session.pending_operations();
    assert_eq!(pending.len(), 2);
    assert_eq!(Some(pending[0].operation_id.clone()), kept_first);
    assert_eq!(Some(pending[1].operation_id.clone()), kept_second);
    assert!(pending.iter().all(|op| op.state == DeliveryState::Queued));
    assert!(session.interrupted_operations().is_empty());
    assert!(dropped.is_some());

    session.connect();
    let mut conn = handshake(&mut server, "s-1").await;

    // First activation: no restore, queued saves in order, ping was dropped
    let first = conn.recv().await.unwrap();
    let second = conn.recv().await.unwrap();
    assert_eq!(first.id, kept_first.map(|id| id.as_str().to_string()));
    assert_eq!(second.id, kept_second.map(|id| id.as_str().to_string()));
    settle().await;
    assert!(conn.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_error_with_correlation_confirms_operation() {
    let (session, _server, mut conn) = connected(CoachOptions::default()).await;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    let _sub = session.on(InboundKind::Error, move |message| {
        if let InboundMessage::Error(error) = message {
            seen.lock().push(error.code.clone());
        }
    });

    let operation_id = session
        .send(OutboundMessage::FileDelete(PathRef {
            path: "missing.rs".to_string(),
        }))
        .unwrap();
    conn.recv().await.unwrap();

    conn.send(&InboundMessage::Error(ServerError {
        code: "file_not_found".to_string(),
        message: "missing.rs does not exist".to_string(),
        correlation_id: Some(operation_id),
    }));
    settle().await;

    assert!(session.pending_operations().is_empty());
    assert_eq!(*errors.lock(), vec!["file_not_found".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_dropped() {
    init_logger();
    let (session, _server, conn) = connected(CoachOptions::default()).await;
    let levels = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&levels);
    let _sub = session.on(InboundKind::HintLevel, move |message| {
        if let InboundMessage::HintLevel(update) = message {
            seen.lock().push(update.level);
        }
    });

    conn.send(&InboundMessage::HintLevel(HintLevelUpdate { level: 1 }));
    conn.send_raw("{ this is not json");
    conn.send_raw(r#"{"type":"weather:report","payload":{}}"#);
    conn.send_raw(r#"{"type":"hints:level","payload":{"level":"loud"}}"#);
    conn.send(&InboundMessage::HintLevel(HintLevelUpdate { level: 3 }));
    conn.send(&InboundMessage::HintLevel(HintLevelUpdate { level: 2 }));
    settle().await;

    assert_eq!(*levels.lock(), vec![1, 3, 2]);
    assert_eq!(session.status().state, ConnectionState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_protocol_version_fails_handshake() {
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    session.connect();

    let mut conn = server.accept().await.unwrap();
    conn.recv().await.unwrap();
    conn.send(&InboundMessage::Welcome(Welcome {
        session_id: SessionId::new("s-1"),
        protocol_version: "9.9".to_string(),
        server_version: None,
    }));

    let status = session
        .wait_for_state(ConnectionState::Reconnecting)
        .await
        .unwrap();
    assert_eq!(status.reconnect_attempt, 1);
    assert!(status.last_error.unwrap().contains("9.9"));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_retrying() {
    let (session, mut server, conn) = connected(CoachOptions::default()).await;
    drop(conn);
    session
        .wait_for_state(ConnectionState::Reconnecting)
        .await
        .unwrap();

    session.disconnect().await;
    assert_eq!(session.status().state, ConnectionState::Disconnected);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(server.connection_attempts(), 1);
    assert!(server.try_accept().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_immediate_messages_dropped_while_inactive() {
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    assert!(session.send(OutboundMessage::Ping {}).is_none());
    settle().await;

    session.connect();
    let mut conn = handshake(&mut server, "s-1").await;
    session.wait_for_state(ConnectionState::Active).await.unwrap();
    settle().await;
    assert!(conn.try_recv().is_none());

    session.send(OutboundMessage::Ping {});
    assert_eq!(conn.recv().await.unwrap().kind, "ping");
}

#[tokio::test(start_paused = true)]
async fn test_status_stream_reports_transitions() {
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    let mut stream = Box::pin(session.status_stream());

    let initial = stream.next().await.unwrap();
    assert_eq!(initial.state, ConnectionState::Disconnected);

    session.connect();
    let _conn = handshake(&mut server, "s-1").await;

    let mut last = initial;
    while last.state != ConnectionState::Active {
        last = stream.next().await.unwrap();
    }
    assert_eq!(last.session_id, Some(SessionId::new("s-1")));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_connection() {
    let (session, _server, conn) = connected(CoachOptions::default()).await;
    assert_ok!(session.shutdown().await);
    settle().await;

    assert!(!conn.is_open());
    assert_err!(session.shutdown().await);
    assert!(session.send(save("late.rs")).is_none());
}
