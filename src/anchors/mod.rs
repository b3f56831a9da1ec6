//! Anchor positions, decorations and file-tree glow
//!
//! [`AnchorTracker`] maps anchored coaching messages to live screen
//! positions through the editor's [`EditorView`]. Positions are recomputed
//! on scroll, when the active file changes and when the set of visible
//! messages changes (compared by id). An anchor the view cannot resolve is
//! hidden, never removed.
//!
//! The tracker also holds backend decorations. Edits dismiss decorations
//! with the same overlap rule ([`edit_invalidates`]) the coaching store uses
//! for messages.

mod glow;
mod predicate;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::{MessageBus, Subscription};
use crate::protocol::{InboundKind, InboundMessage};
use crate::types::advice::{CoachingMessage, Decoration};
use crate::types::identifiers::{DecorationId, MessageId};
use crate::types::text::{Anchor, ScreenRect, TextRange};

pub use glow::{
    ANCESTOR_FADE, DIRECTORY_INTENSITY, FILE_INTENSITY, FileTreeGlow, PARENT_INTENSITY, glow_for,
};
pub use predicate::edit_invalidates;

/// Editor capability the tracker consumes
pub trait EditorView: Send + Sync {
    /// Screen rectangle of a position in the active file, `None` if off-screen
    fn resolve(&self, line: u32, column: u32) -> Option<ScreenRect>;

    /// Ticks whenever the viewport scrolls
    fn scroll_events(&self) -> watch::Receiver<u64>;
}

#[derive(Default)]
struct TrackerState {
    active_file: Option<String>,
    anchors: Vec<(MessageId, Anchor)>,
    visible_ids: BTreeSet<MessageId>,
    positions: HashMap<MessageId, ScreenRect>,
    decorations: Vec<Decoration>,
    recomputes: u64,
}

/// Live screen positions of anchored messages
pub struct AnchorTracker {
    view: Arc<dyn EditorView>,
    state: Mutex<TrackerState>,
}

impl AnchorTracker {
    /// Create a tracker over an editor view
    pub fn new(view: Arc<dyn EditorView>) -> Self {
        Self {
            view,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Switch the file shown in the editor
    pub fn set_active_file(&self, file: Option<String>) {
        let mut state = self.state.lock();
        if state.active_file == file {
            return;
        }
        state.active_file = file;
        self.recompute(&mut state);
    }

    /// File currently shown in the editor
    #[must_use]
    pub fn active_file(&self) -> Option<String> {
        self.state.lock().active_file.clone()
    }

    /// Replace the set of messages the tracker positions
    ///
    /// Ambient messages are ignored. Returns `false`, without recomputing,
    /// when the anchored ids are the same as before.
    pub fn set_visible_messages(&self, messages: &[CoachingMessage]) -> bool {
        let anchors: Vec<(MessageId, Anchor)> = messages
            .iter()
            .filter_map(|m| m.anchor.clone().map(|anchor| (m.message_id.clone(), anchor)))
            .collect();
        let ids: BTreeSet<MessageId> = anchors.iter().map(|(id, _)| id.clone()).collect();

        let mut state = self.state.lock();
        if state.visible_ids == ids {
            return false;
        }
        state.visible_ids = ids;
        state.anchors = anchors;
        self.recompute(&mut state);
        true
    }

    /// Viewport moved
    pub fn on_scroll(&self) {
        let mut state = self.state.lock();
        self.recompute(&mut state);
    }

    /// Position of one message, `None` when hidden
    #[must_use]
    pub fn position(&self, id: &MessageId) -> Option<ScreenRect> {
        self.state.lock().positions.get(id).copied()
    }

    /// Positions of every shown message
    #[must_use]
    pub fn positions(&self) -> HashMap<MessageId, ScreenRect> {
        self.state.lock().positions.clone()
    }

    /// How many times positions were recomputed
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.state.lock().recomputes
    }

    /// Add or replace a decoration
    pub fn add_decoration(&self, decoration: Decoration) {
        let mut state = self.state.lock();
        state
            .decorations
            .retain(|d| d.decoration_id != decoration.decoration_id);
        state.decorations.push(decoration);
    }

    /// Remove the listed decorations, or all of them
    pub fn clear_decorations(&self, ids: Option<&[DecorationId]>) -> usize {
        let mut state = self.state.lock();
        let before = state.decorations.len();
        match ids {
            Some(ids) => state.decorations.retain(|d| !ids.contains(&d.decoration_id)),
            None => state.decorations.clear(),
        }
        before - state.decorations.len()
    }

    /// Every decoration, in arrival order
    #[must_use]
    pub fn decorations(&self) -> Vec<Decoration> {
        self.state.lock().decorations.clone()
    }

    /// Decorations for one file
    #[must_use]
    pub fn decorations_for(&self, file: &str) -> Vec<Decoration> {
        self.state
            .lock()
            .decorations
            .iter()
            .filter(|d| d.file == file)
            .cloned()
            .collect()
    }

    /// Dismiss decorations an edit overlaps; returns their ids
    pub fn apply_edit(&self, file: &str, edit: &TextRange) -> Vec<DecorationId> {
        let mut state = self.state.lock();
        let mut dismissed = Vec::new();
        state.decorations.retain(|d| {
            if d.file == file && edit_invalidates(edit, &d.range) {
                dismissed.push(d.decoration_id.clone());
                false
            } else {
                true
            }
        });
        dismissed
    }

    /// Recompute on every scroll tick of the view
    ///
    /// The listener stops when the tracker is dropped or the view stops
    /// producing events.
    pub fn watch_scroll(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker: Weak<Self> = Arc::downgrade(self);
        let mut ticks = self.view.scroll_events();
        tokio::spawn(async move {
            while ticks.changed().await.is_ok() {
                let Some(tracker) = tracker.upgrade() else {
                    break;
                };
                tracker.on_scroll();
            }
        })
    }

    /// Subscribe to decoration traffic on the bus
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> Vec<Subscription> {
        let on_add = Arc::clone(self);
        let on_clear = Arc::clone(self);
        vec![
            bus.on(InboundKind::DecorationAdd, move |message| {
                if let InboundMessage::DecorationAdd(decoration) = message {
                    on_add.add_decoration(decoration.clone());
                }
            }),
            bus.on(InboundKind::DecorationClear, move |message| {
                if let InboundMessage::DecorationClear(clear) = message {
                    on_clear.clear_decorations(clear.decoration_ids.as_deref());
                }
            }),
        ]
    }

    fn recompute(&self, state: &mut TrackerState) {
        state.recomputes += 1;
        let positions = match &state.active_file {
            Some(active) => state
                .anchors
                .iter()
                .filter(|(_, anchor)| &anchor.file == active)
                .filter_map(|(id, anchor)| {
                    self.view
                        .resolve(anchor.range.start_line, anchor.range.start_column)
                        .map(|rect| (id.clone(), rect))
                })
                .collect(),
            None => HashMap::new(),
        };
        state.positions = positions;
    }
}

impl std::fmt::Debug for AnchorTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AnchorTracker")
            .field("active_file", &state.active_file)
            .field("anchors", &state.anchors.len())
            .field("shown", &state.positions.len())
            .field("decorations", &state.decorations.len())
            .finish()
    }
}
