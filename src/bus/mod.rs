//! Type-indexed message bus
//!
//! The session manager publishes every decoded inbound message here, in
//! arrival order. Components register handlers per [`InboundKind`] and get
//! back a [`Subscription`] that unregisters the handler when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::protocol::{InboundKind, InboundMessage};

/// Shared handler for inbound messages
pub type Handler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<InboundKind, Vec<(u64, Handler)>>,
}

/// Publish/subscribe hub keyed by message kind
#[derive(Clone, Default)]
pub struct MessageBus {
    registry: Arc<Mutex<Registry>>,
}

impl MessageBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one message kind
    ///
    /// The handler stays registered for as long as the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn on<F>(&self, kind: InboundKind, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.register(kind, Self::callback(handler))
    }

    /// Register an already shared handler
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn register(&self, kind: InboundKind, handler: Handler) -> Subscription {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.entry(kind).or_default().push((id, handler));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Deliver a message to every handler registered for its kind
    ///
    /// Handlers run in registration order, outside the registry lock, so a
    /// handler may subscribe or unsubscribe while being called. Returns the
    /// number of handlers invoked.
    pub fn publish(&self, message: &InboundMessage) -> usize {
        let kind = message.kind();
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock();
            registry
                .handlers
                .get(&kind)
                .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            log::trace!("No subscribers for {kind}");
        }
        for handler in &handlers {
            handler(message);
        }
        handlers.len()
    }

    /// Number of live handlers for a kind
    #[must_use]
    pub fn subscriber_count(&self, kind: InboundKind) -> usize {
        self.registry
            .lock()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Create a shared handler from a closure
    pub fn callback<F>(f: F) -> Handler
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        Arc::new(f)
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        let total: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("MessageBus")
            .field("subscriptions", &total)
            .finish()
    }
}

/// Scoped registration of a bus handler
///
/// Dropping the subscription removes the handler. Other handlers for the
/// same kind are unaffected.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: InboundKind,
    id: u64,
}

impl Subscription {
    /// Kind this subscription listens to
    #[must_use]
    pub const fn kind(&self) -> InboundKind {
        self.kind
    }

    /// Unregister now
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock();
        if let Some(entries) = registry.handlers.get_mut(&self.kind) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                registry.handlers.remove(&self.kind);
            }
        }
    }
}
