//! Coaching message store
//!
//! Messages accumulate by stable id. How each one is shown is decided by
//! [`render_mode`] from the current hint level, the message's source and
//! whether the user expanded it; nothing about rendering is stored on the
//! message itself.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::anchors::edit_invalidates;
use crate::bus::{MessageBus, Subscription};
use crate::hints::{HintCoordinator, HintLevel};
use crate::protocol::{DismissRequest, InboundKind, InboundMessage, OutboundMessage};
use crate::session::Outbox;
use crate::types::text::TextRange;

pub use crate::types::advice::{AdviceKind, CoachingMessage, MessageSource};
use crate::types::identifiers::MessageId;

/// Capacity of the ambient notice channel
const AMBIENT_CAPACITY: usize = 64;

/// How a coaching message is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Transient notification outside the editor
    Ambient,
    /// Inline, body visible
    Full,
    /// Inline marker, body hidden until expanded
    Collapsed,
}

/// Decide how a message renders
///
/// Pure: the same inputs always give the same mode.
#[must_use]
pub fn render_mode(message: &CoachingMessage, level: HintLevel, expanded: bool) -> RenderMode {
    if message.anchor.is_none() {
        RenderMode::Ambient
    } else if message.source.is_user_requested() || expanded || level >= HintLevel::FULL_DETAIL {
        RenderMode::Full
    } else {
        RenderMode::Collapsed
    }
}

/// A stored message together with its current presentation
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    /// The message
    pub message: CoachingMessage,
    /// Presentation at the current level
    pub mode: RenderMode,
    /// Severity as shown; unknown tags map to the loudest
    pub kind: AdviceKind,
}

#[derive(Default)]
struct StoreState {
    messages: Vec<CoachingMessage>,
    expanded: HashSet<MessageId>,
    seen: HashSet<MessageId>,
}

impl StoreState {
    fn remove_where(&mut self, mut predicate: impl FnMut(&CoachingMessage) -> bool) -> Vec<MessageId> {
        let mut removed = Vec::new();
        self.messages.retain(|message| {
            if predicate(message) {
                removed.push(message.message_id.clone());
                false
            } else {
                true
            }
        });
        for id in &removed {
            self.expanded.remove(id);
        }
        removed
    }
}

/// Accumulates advisory messages and answers rendering questions
pub struct CoachingStore {
    state: Mutex<StoreState>,
    hints: Arc<HintCoordinator>,
    outbox: Arc<dyn Outbox>,
    ambient_tx: broadcast::Sender<CoachingMessage>,
    revision: watch::Sender<u64>,
}

impl CoachingStore {
    /// Create an empty store
    pub fn new(hints: Arc<HintCoordinator>, outbox: Arc<dyn Outbox>) -> Self {
        let (ambient_tx, _) = broadcast::channel(AMBIENT_CAPACITY);
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(StoreState::default()),
            hints,
            outbox,
            ambient_tx,
            revision,
        }
    }

    /// Add a message
    ///
    /// Ids seen earlier in the session, including dismissed or cleared ones,
    /// are ignored.
    /// Returns whether the message was added.
    pub fn ingest(&self, message: CoachingMessage) -> bool {
        {
            let mut state = self.state.lock();
            if !state.seen.insert(message.message_id.clone()) {
                log::debug!("Ignoring duplicate coaching message {}", message.message_id);
                return false;
            }
            state.messages.push(message.clone());
        }

        if message.anchor.is_none() {
            // No receivers is fine
            let _ = self.ambient_tx.send(message);
        }
        self.bump();
        true
    }

    /// Render a message in full regardless of level
    ///
    /// Survives later level decreases. Returns `false` for unknown ids.
    pub fn expand(&self, id: &MessageId) -> bool {
        let changed = {
            let mut state = self.state.lock();
            if !state.messages.iter().any(|m| &m.message_id == id) {
                return false;
            }
            state.expanded.insert(id.clone())
        };
        if changed {
            self.bump();
        }
        true
    }

    /// Return an expanded message to level-driven rendering
    pub fn collapse(&self, id: &MessageId) -> bool {
        let changed = self.state.lock().expanded.remove(id);
        if changed {
            self.bump();
        }
        changed
    }

    /// Remove a message and tell the backend
    ///
    /// Unknown ids are a no-op.
    pub fn dismiss(&self, id: &MessageId) -> bool {
        let removed = self.state.lock().remove_where(|m| &m.message_id == id);
        if removed.is_empty() {
            return false;
        }
        self.outbox.send(OutboundMessage::Dismiss(DismissRequest {
            message_id: id.clone(),
        }));
        self.bump();
        true
    }

    /// Remove the listed messages, or all of them
    ///
    /// Backend-driven, so nothing is sent back. Returns the removed ids.
    pub fn clear(&self, ids: Option<&[MessageId]>) -> Vec<MessageId> {
        let removed = self.state.lock().remove_where(|m| match ids {
            Some(ids) => ids.contains(&m.message_id),
            None => true,
        });
        if !removed.is_empty() {
            self.bump();
        }
        removed
    }

    /// Forget everything, including which ids were already seen
    ///
    /// Used when the session ends. Returns the removed ids.
    pub fn reset(&self) -> Vec<MessageId> {
        let (removed, forgotten) = {
            let mut state = self.state.lock();
            let removed = state.remove_where(|_| true);
            let forgotten = state.seen.len();
            state.seen.clear();
            state.expanded.clear();
            (removed, forgotten)
        };
        if !removed.is_empty() {
            self.bump();
        }
        log::debug!("Coaching store reset, forgot {forgotten} seen id(s)");
        removed
    }

    /// Drop coaching-sourced messages on a phase transition
    ///
    /// Explain and observer output stay. Nothing is sent to the backend.
    pub fn clear_phase(&self) -> Vec<MessageId> {
        let removed = self
            .state
            .lock()
            .remove_where(|m| m.source == MessageSource::Coaching);
        if !removed.is_empty() {
            log::debug!("Phase change cleared {} coaching message(s)", removed.len());
            self.bump();
        }
        removed
    }

    /// Auto-dismiss anchored messages an edit overlaps
    ///
    /// Each dismissed message is reported to the backend like a manual
    /// dismissal. Returns the dismissed ids.
    pub fn apply_edit(&self, file: &str, edit: &TextRange) -> Vec<MessageId> {
        let removed = self.state.lock().remove_where(|m| {
            m.anchor
                .as_ref()
                .is_some_and(|anchor| anchor.file == file && edit_invalidates(edit, &anchor.range))
        });
        for id in &removed {
            self.outbox.send(OutboundMessage::Dismiss(DismissRequest {
                message_id: id.clone(),
            }));
        }
        if !removed.is_empty() {
            self.bump();
        }
        removed
    }

    /// Stored messages in arrival order
    #[must_use]
    pub fn messages(&self) -> Vec<CoachingMessage> {
        self.state.lock().messages.clone()
    }

    /// Look up one message
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<CoachingMessage> {
        self.state
            .lock()
            .messages
            .iter()
            .find(|m| &m.message_id == id)
            .cloned()
    }

    /// Whether the user expanded a message
    #[must_use]
    pub fn is_expanded(&self, id: &MessageId) -> bool {
        self.state.lock().expanded.contains(id)
    }

    /// Every stored message with its presentation at the current level
    #[must_use]
    pub fn rendered(&self) -> Vec<RenderedMessage> {
        let level = self.hints.level();
        let state = self.state.lock();
        state
            .messages
            .iter()
            .map(|message| RenderedMessage {
                mode: render_mode(message, level, state.expanded.contains(&message.message_id)),
                kind: message.kind.effective(),
                message: message.clone(),
            })
            .collect()
    }

    /// Number of stored messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Receive ambient (unanchored) messages as they arrive
    #[must_use]
    pub fn ambient_notices(&self) -> broadcast::Receiver<CoachingMessage> {
        self.ambient_tx.subscribe()
    }

    /// Revision counter, bumped on every change
    #[must_use]
    pub fn watch_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Subscribe to coaching traffic on the bus
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> Vec<Subscription> {
        let store = Arc::clone(self);
        let handler = MessageBus::callback(move |message| match message {
            InboundMessage::CoachingMessage(message) => {
                store.ingest(message.clone());
            }
            InboundMessage::CoachingClear(clear) => {
                store.clear(clear.message_ids.as_deref());
            }
            InboundMessage::PhaseChanged(change) => {
                log::debug!("Phase changed to {}", change.phase);
                store.clear_phase();
            }
            InboundMessage::SessionEnded {} => {
                store.reset();
            }
            _ => {}
        });

        [
            InboundKind::CoachingMessage,
            InboundKind::CoachingClear,
            InboundKind::PhaseChanged,
            InboundKind::SessionEnded,
        ]
        .into_iter()
        .map(|kind| bus.register(kind, Arc::clone(&handler)))
        .collect()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl std::fmt::Debug for CoachingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachingStore")
            .field("messages", &self.len())
            .finish_non_exhaustive()
    }
}
