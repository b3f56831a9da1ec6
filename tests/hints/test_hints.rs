//! Tests for `HintCoordinator`

use std::sync::Arc;
use std::time::Duration;

use kodegen_coach_client::protocol::{
    HintLevelUpdate, InboundMessage, OutboundMessage, SessionRestored,
};
use kodegen_coach_client::transport::memory_pair;
use kodegen_coach_client::{
    CoachOptions, ConnectionState, HintCoordinator, HintLevel, MessageBus, OperationId, Outbox,
    SessionManager,
};
use parking_lot::Mutex;

/// Outbox that remembers everything sent through it
#[derive(Default)]
struct RecordingOutbox {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingOutbox {
    fn levels(&self) -> Vec<u8> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                OutboundMessage::HintLevelChange(change) => Some(change.level),
                _ => None,
            })
            .collect()
    }
}

impl Outbox for RecordingOutbox {
    fn send(&self, message: OutboundMessage) -> Option<OperationId> {
        self.sent.lock().push(message);
        None
    }
}

fn coordinator() -> (Arc<HintCoordinator>, Arc<RecordingOutbox>) {
    let outbox = Arc::new(RecordingOutbox::default());
    let hints = Arc::new(HintCoordinator::new(outbox.clone()));
    (hints, outbox)
}

#[test]
fn test_starts_at_default_level() {
    let (hints, outbox) = coordinator();
    assert_eq!(hints.level(), HintLevel::DEFAULT);
    assert_eq!(hints.level().value(), 1);
    assert!(outbox.sent.lock().is_empty());
}

#[test]
fn test_out_of_range_levels_clamp() {
    let (hints, outbox) = coordinator();

    assert_eq!(hints.set_level(7), HintLevel::MAX);
    assert_eq!(hints.set_level(-2), HintLevel::MIN);
    assert_eq!(outbox.levels(), vec![3, 0]);
}

#[test]
fn test_repeating_the_level_sends_once() {
    let (hints, outbox) = coordinator();

    for _ in 0..3 {
        hints.set_level(3);
    }
    assert_eq!(hints.level(), HintLevel::MAX);
    assert_eq!(outbox.levels(), vec![3]);
}

#[test]
fn test_backend_updates_are_not_echoed() {
    let (hints, outbox) = coordinator();
    let bus = MessageBus::new();
    let _subs = hints.attach(&bus);
    let watcher = hints.watch();

    bus.publish(&InboundMessage::HintLevel(HintLevelUpdate { level: 2 }));
    assert_eq!(hints.level().value(), 2);
    assert!(watcher.has_changed().unwrap());

    bus.publish(&InboundMessage::Restored(SessionRestored {
        hint_level: Some(9),
        phase: None,
    }));
    assert_eq!(hints.level(), HintLevel::MAX);

    // A restore without a level leaves it alone
    bus.publish(&InboundMessage::Restored(SessionRestored::default()));
    assert_eq!(hints.level(), HintLevel::MAX);

    assert!(outbox.sent.lock().is_empty());
}

#[test]
fn test_unchanged_level_does_not_notify_watchers() {
    let (hints, _outbox) = coordinator();
    let watcher = hints.watch();

    hints.set_level(1);
    hints.restore(1);
    assert!(!watcher.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_reach_backend_once() {
    let (transport, mut server) = memory_pair();
    let session = SessionManager::new(transport, CoachOptions::default(), MessageBus::new());
    let hints = HintCoordinator::new(Arc::new(session.clone()));

    session.connect();
    let mut conn = server.accept().await.unwrap();
    conn.recv().await.unwrap();
    conn.welcome("s-1");
    session.wait_for_state(ConnectionState::Active).await.unwrap();

    hints.set_level(2);
    hints.set_level(3);
    hints.set_level(3);
    hints.set_level(3);
    assert_eq!(hints.level(), HintLevel::MAX);

    let change = conn.recv().await.unwrap();
    assert_eq!(change.kind, "hints:level_change");
    assert_eq!(change.payload["level"], 3);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(conn.try_recv().is_none());
}
