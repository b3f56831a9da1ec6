//! Tests for `MessageBus`
//!
//! Independent subscribers per kind, scoped unregistration and dispatch
//! order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kodegen_coach_client::protocol::{HintLevelUpdate, InboundKind, InboundMessage, PhaseChanged};
use kodegen_coach_client::MessageBus;
use parking_lot::Mutex;

fn level(level: i64) -> InboundMessage {
    InboundMessage::HintLevel(HintLevelUpdate { level })
}

#[test]
fn test_multiple_subscribers_per_kind() {
    let bus = MessageBus::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&first);
    let _a = bus.on(InboundKind::HintLevel, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&second);
    let _b = bus.on(InboundKind::HintLevel, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(bus.publish(&level(2)), 2);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropping_subscription_leaves_others() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    let keep = bus.on(InboundKind::HintLevel, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(&hits);
    let gone = bus.on(InboundKind::HintLevel, move |_| {
        counter.fetch_add(10, Ordering::SeqCst);
    });
    assert_eq!(bus.subscriber_count(InboundKind::HintLevel), 2);

    gone.unsubscribe();
    assert_eq!(bus.subscriber_count(InboundKind::HintLevel), 1);

    bus.publish(&level(1));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    drop(keep);
    assert_eq!(bus.subscriber_count(InboundKind::HintLevel), 0);
    assert_eq!(bus.publish(&level(1)), 0);
}

#[test]
fn test_kinds_are_isolated() {
    let bus = MessageBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    let _phase = bus.on(InboundKind::PhaseChanged, move |message| {
        log.lock().push(message.kind());
    });

    bus.publish(&level(3));
    bus.publish(&InboundMessage::PhaseChanged(PhaseChanged {
        phase: "implement".to_string(),
    }));

    assert_eq!(*seen.lock(), vec![InboundKind::PhaseChanged]);
}

#[test]
fn test_dispatch_in_publish_order() {
    let bus = MessageBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    let _sub = bus.on(InboundKind::HintLevel, move |message| {
        if let InboundMessage::HintLevel(update) = message {
            log.lock().push(update.level);
        }
    });

    for n in [3, 1, 2] {
        bus.publish(&level(n));
    }
    assert_eq!(*seen.lock(), vec![3, 1, 2]);
}

#[test]
fn test_handler_may_unsubscribe_itself() {
    let bus = MessageBus::new();
    let slot: Arc<Mutex<Option<kodegen_coach_client::Subscription>>> = Arc::new(Mutex::new(None));
    let hits = Arc::new(AtomicUsize::new(0));

    let own = Arc::clone(&slot);
    let counter = Arc::clone(&hits);
    let subscription = bus.on(InboundKind::HintLevel, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        own.lock().take();
    });
    *slot.lock() = Some(subscription);

    bus.publish(&level(1));
    bus.publish(&level(2));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_subscription_outliving_bus_is_harmless() {
    let bus = MessageBus::new();
    let subscription = bus.on(InboundKind::Pong, |_| {});
    drop(bus);
    assert_eq!(subscription.kind(), InboundKind::Pong);
    drop(subscription);
}
