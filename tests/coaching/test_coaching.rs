//! Tests for `CoachingStore` and render classification

use std::sync::Arc;

use kodegen_coach_client::protocol::{
    CoachingClear, InboundMessage, OutboundMessage, PhaseChanged,
};
use kodegen_coach_client::{
    AdviceKind, Anchor, CoachingMessage, CoachingStore, HintCoordinator, HintLevel, MessageBus,
    MessageId, MessageSource, OperationId, Outbox, RenderMode, TextRange, render_mode,
};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingOutbox {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingOutbox {
    fn dismissed(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                OutboundMessage::Dismiss(dismiss) => Some(dismiss.message_id.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl Outbox for RecordingOutbox {
    fn send(&self, message: OutboundMessage) -> Option<OperationId> {
        self.sent.lock().push(message);
        Some(OperationId::generate())
    }
}

struct Fixture {
    hints: Arc<HintCoordinator>,
    store: Arc<CoachingStore>,
    outbox: Arc<RecordingOutbox>,
}

fn fixture() -> Fixture {
    let outbox = Arc::new(RecordingOutbox::default());
    let hints = Arc::new(HintCoordinator::new(outbox.clone()));
    let store = Arc::new(CoachingStore::new(Arc::clone(&hints), outbox.clone()));
    Fixture {
        hints,
        store,
        outbox,
    }
}

fn anchored(id: &str, file: &str, start: u32, end: u32) -> CoachingMessage {
    CoachingMessage::anchored(
        id,
        format!("note {id}"),
        Anchor::new(file, TextRange::lines(start, end)),
    )
}

fn mode_of(store: &CoachingStore, id: &str) -> Option<RenderMode> {
    store
        .rendered()
        .into_iter()
        .find(|rendered| rendered.message.message_id.as_str() == id)
        .map(|rendered| rendered.mode)
}

#[test]
fn test_render_mode_table() {
    let ambient = CoachingMessage::ambient("a", "Take a break");
    let coaching = anchored("c", "src/lib.rs", 1, 2);
    let explain = anchored("e", "src/lib.rs", 1, 2).with_source(MessageSource::Explain);
    let observer = anchored("o", "src/lib.rs", 1, 2).with_source(MessageSource::Observer);

    for level in 0..=3 {
        let level = HintLevel::clamp(level);
        for expanded in [false, true] {
            assert_eq!(render_mode(&ambient, level, expanded), RenderMode::Ambient);
            assert_eq!(render_mode(&explain, level, expanded), RenderMode::Full);
            assert_eq!(render_mode(&observer, level, expanded), RenderMode::Full);
        }
    }

    assert_eq!(render_mode(&coaching, HintLevel::clamp(0), false), RenderMode::Collapsed);
    assert_eq!(render_mode(&coaching, HintLevel::clamp(1), false), RenderMode::Collapsed);
    assert_eq!(render_mode(&coaching, HintLevel::clamp(2), false), RenderMode::Full);
    assert_eq!(render_mode(&coaching, HintLevel::clamp(3), false), RenderMode::Full);
    assert_eq!(render_mode(&coaching, HintLevel::clamp(0), true), RenderMode::Full);

    // Same inputs, same answer
    let first = render_mode(&coaching, HintLevel::DEFAULT, false);
    let second = render_mode(&coaching, HintLevel::DEFAULT, false);
    assert_eq!(first, second);
}

#[test]
fn test_ingest_is_idempotent() {
    let f = fixture();
    let changes = f.store.watch_changes();

    assert!(f.store.ingest(anchored("m-1", "a.rs", 1, 1)));
    assert!(!f.store.ingest(anchored("m-1", "a.rs", 5, 5)));
    assert_eq!(f.store.len(), 1);
    assert_eq!(*changes.borrow(), 1);

    let stored = f.store.get(&MessageId::new("m-1")).unwrap();
    assert_eq!(stored.anchor.unwrap().range, TextRange::lines(1, 1));
}

#[test]
fn test_level_changes_reclassify_without_mutation() {
    let f = fixture();
    f.store.ingest(anchored("m-1", "a.rs", 1, 1));
    let before = f.store.messages();

    assert_eq!(mode_of(&f.store, "m-1"), Some(RenderMode::Collapsed));
    f.hints.set_level(2);
    assert_eq!(mode_of(&f.store, "m-1"), Some(RenderMode::Full));
    f.hints.set_level(0);
    assert_eq!(mode_of(&f.store, "m-1"), Some(RenderMode::Collapsed));

    assert_eq!(f.store.messages(), before);
}

#[test]
fn test_expansion_survives_level_decrease() {
    let f = fixture();
    f.store.ingest(anchored("m-1", "a.rs", 1, 1));
    let id = MessageId::new("m-1");

    assert!(f.store.expand(&id));
    assert!(f.store.is_expanded(&id));
    f.hints.set_level(3);
    f.hints.set_level(0);
    assert_eq!(mode_of(&f.store, "m-1"), Some(RenderMode::Full));

    assert!(f.store.collapse(&id));
    assert_eq!(mode_of(&f.store, "m-1"), Some(RenderMode::Collapsed));
    assert!(!f.store.expand(&MessageId::new("missing")));
}

#[test]
fn test_unknown_kind_renders_as_error() {
    let f = fixture();
    f.store
        .ingest(anchored("m-1", "a.rs", 1, 1).with_kind(AdviceKind::Unknown));
    assert_eq!(f.store.rendered()[0].kind, AdviceKind::Error);
}

#[test]
fn test_dismiss_notifies_backend_and_blocks_readmission() {
    let f = fixture();
    f.store.ingest(anchored("m-1", "a.rs", 1, 1));
    let id = MessageId::new("m-1");

    assert!(f.store.dismiss(&id));
    assert!(!f.store.dismiss(&id));
    assert_eq!(f.outbox.dismissed(), vec!["m-1".to_string()]);

    assert!(!f.store.ingest(anchored("m-1", "a.rs", 1, 1)));
    assert!(f.store.is_empty());
}

#[test]
fn test_phase_clear_keeps_requested_content() {
    let f = fixture();
    f.store.ingest(anchored("c-1", "a.rs", 1, 1));
    f.store.ingest(CoachingMessage::ambient("c-2", "Remember the tests"));
    f.store
        .ingest(anchored("e-1", "a.rs", 3, 3).with_source(MessageSource::Explain));
    f.store
        .ingest(anchored("o-1", "a.rs", 4, 4).with_source(MessageSource::Observer));

    let removed = f.store.clear_phase();
    assert_eq!(removed, vec![MessageId::new("c-1"), MessageId::new("c-2")]);

    let left: Vec<_> = f
        .store
        .messages()
        .into_iter()
        .map(|m| m.message_id.to_string())
        .collect();
    assert_eq!(left, vec!["e-1", "o-1"]);
    assert!(f.outbox.sent.lock().is_empty());
}

#[test]
fn test_edit_dismisses_overlapping_anchors() {
    let f = fixture();
    f.store.ingest(anchored("hit", "a.rs", 10, 12));
    f.store.ingest(anchored("above", "a.rs", 20, 22));
    f.store.ingest(anchored("other-file", "b.rs", 10, 12));
    f.store.ingest(CoachingMessage::ambient("ambient", "hi"));

    let removed = f.store.apply_edit("a.rs", &TextRange::on_line(11, 0, 4));
    assert_eq!(removed, vec![MessageId::new("hit")]);
    assert_eq!(f.outbox.dismissed(), vec!["hit".to_string()]);
    assert_eq!(f.store.len(), 3);

    assert!(f.store.apply_edit("a.rs", &TextRange::on_line(30, 0, 1)).is_empty());
}

#[tokio::test]
async fn test_ambient_messages_are_broadcast() {
    let f = fixture();
    let mut notices = f.store.ambient_notices();

    f.store.ingest(anchored("inline", "a.rs", 1, 1));
    f.store.ingest(CoachingMessage::ambient("ambient", "Nice progress"));

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.message_id.as_str(), "ambient");
    assert!(notices.try_recv().is_err());
}

#[test]
fn test_bus_traffic_drives_the_store() {
    let f = fixture();
    let bus = MessageBus::new();
    let _subs = f.store.attach(&bus);

    for id in ["m-1", "m-2", "m-3"] {
        bus.publish(&InboundMessage::CoachingMessage(anchored(id, "a.rs", 1, 1)));
    }
    bus.publish(&InboundMessage::CoachingMessage(
        anchored("x-1", "a.rs", 2, 2).with_source(MessageSource::Explain),
    ));
    assert_eq!(f.store.len(), 4);

    bus.publish(&InboundMessage::CoachingClear(CoachingClear {
        message_ids: Some(vec![MessageId::new("m-2")]),
    }));
    assert_eq!(f.store.len(), 3);

    bus.publish(&InboundMessage::PhaseChanged(PhaseChanged {
        phase: "test".to_string(),
    }));
    assert_eq!(f.store.len(), 1);

    bus.publish(&InboundMessage::SessionEnded {});
    assert!(f.store.is_empty());
    assert!(f.outbox.sent.lock().is_empty());
}

#[test]
fn test_session_end_forgets_seen_ids() {
    let f = fixture();
    let bus = MessageBus::new();
    let _subs = f.store.attach(&bus);

    bus.publish(&InboundMessage::CoachingMessage(anchored("m-1", "a.rs", 1, 1)));
    assert!(f.store.expand(&MessageId::new("m-1")));
    assert!(f.store.dismiss(&MessageId::new("m-1")));
    assert!(!f.store.ingest(anchored("m-1", "a.rs", 1, 1)));

    bus.publish(&InboundMessage::SessionEnded {});
    assert!(f.store.ingest(anchored("m-1", "a.rs", 3, 3)));
    assert!(!f.store.is_expanded(&MessageId::new("m-1")));
    assert!(!f.store.ingest(anchored("m-1", "a.rs", 3, 3)));
    assert_eq!(f.store.len(), 1);
}
