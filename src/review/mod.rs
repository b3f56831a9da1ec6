//! Review navigation
//!
//! At most one review session is active. A new batch atomically replaces
//! the previous one. `next`/`previous` do nothing at the ends, and a target
//! in another file opens that file before the focus moves. Closing a file
//! takes its comments out of navigation without deleting them, and reopening
//! it brings them back. When nothing navigable is left the review exits. Phase transitions never touch a
//! review, the end of the session always exits it.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::bus::{MessageBus, Subscription};
use crate::protocol::{InboundKind, InboundMessage};
use crate::types::advice::{Decoration, DecorationStyle, ReviewComment};
use crate::types::identifiers::{DecorationId, MessageId};

/// Editor capability used for cross-file jumps
pub trait FileOpener: Send + Sync {
    /// Bring a file to the front of the editor
    fn open_file(&self, file: &str);
}

/// What the UI needs to draw the review panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSnapshot {
    /// Whether a review is running
    pub active: bool,
    /// Review scope
    pub scope: Option<String>,
    /// Position of the focused comment among navigable ones
    pub index: usize,
    /// Number of navigable comments
    pub total: usize,
    /// Focused comment
    pub focused: Option<ReviewComment>,
}

struct ReviewSession {
    generation: u64,
    scope: String,
    comments: Vec<ReviewComment>,
    closed_files: HashSet<String>,
    index: usize,
}

impl ReviewSession {
    fn navigable(&self) -> Vec<&ReviewComment> {
        self.comments
            .iter()
            .filter(|c| !self.closed_files.contains(&c.file))
            .collect()
    }

    fn focused(&self) -> Option<&ReviewComment> {
        self.navigable().get(self.index).copied()
    }
}

#[derive(Default)]
struct NavigatorState {
    session: Option<ReviewSession>,
    open_file: Option<String>,
    generation: u64,
}

/// Review state machine: inactive, or active with an ordered comment list
pub struct ReviewNavigator {
    state: Mutex<NavigatorState>,
    opener: Arc<dyn FileOpener>,
    revision: watch::Sender<u64>,
}

enum Step {
    Next,
    Previous,
}

impl ReviewNavigator {
    /// Create an inactive navigator
    pub fn new(opener: Arc<dyn FileOpener>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(NavigatorState::default()),
            opener,
            revision,
        }
    }

    /// Start a review, replacing any running one
    ///
    /// Focus goes to the first comment. An empty batch leaves the navigator
    /// inactive.
    pub fn start(&self, scope: impl Into<String>, comments: Vec<ReviewComment>) {
        let scope = scope.into();
        let target = {
            let mut state = self.state.lock();
            if comments.is_empty() {
                log::debug!("Empty review for {scope}, nothing to navigate");
                state.session = None;
                None
            } else {
                state.generation += 1;
                let session = ReviewSession {
                    generation: state.generation,
                    scope,
                    comments,
                    closed_files: HashSet::new(),
                    index: 0,
                };
                let first = session.focused().map(|c| c.file.clone());
                state.session = Some(session);
                first.filter(|file| state.open_file.as_ref() != Some(file))
            }
        };

        if let Some(file) = target {
            self.switch_to(&file);
        }
        self.bump();
    }

    /// Focus the next comment
    ///
    /// At the last comment this is a no-op and returns `None`.
    pub fn next(&self) -> Option<ReviewComment> {
        self.step(Step::Next)
    }

    /// Focus the previous comment; `None` and no-op at the first one
    pub fn previous(&self) -> Option<ReviewComment> {
        self.step(Step::Previous)
    }

    /// Record which file the editor shows
    pub fn set_open_file(&self, file: Option<String>) {
        self.state.lock().open_file = file;
    }

    /// A file was opened: it becomes the open file and its comments rejoin
    /// navigation
    ///
    /// The focused comment keeps focus.
    pub fn on_file_opened(&self, file: &str) {
        {
            let mut state = self.state.lock();
            state.open_file = Some(file.to_string());
            let Some(session) = state.session.as_mut() else {
                return;
            };

            let focused_id = session.focused().map(|c| c.message_id.clone());
            if !session.closed_files.remove(file) {
                return;
            }
            let position = focused_id
                .and_then(|id| session.navigable().iter().position(|c| c.message_id == id));
            if let Some(position) = position {
                session.index = position;
            }
        }

        log::debug!("Reopened {file}, its review comments are navigable again");
        self.bump();
    }

    /// A file was closed: its comments leave navigation
    ///
    /// The focused comment keeps focus if it survives; otherwise the index
    /// clamps. With nothing navigable left the review exits.
    pub fn on_file_closed(&self, file: &str) {
        let exit = {
            let mut state = self.state.lock();
            if state.open_file.as_deref() == Some(file) {
                state.open_file = None;
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };

            let focused_id = session.focused().map(|c| c.message_id.clone());
            if !session.closed_files.insert(file.to_string()) {
                return;
            }

            let navigable: Vec<MessageId> = session
                .navigable()
                .into_iter()
                .map(|c| c.message_id.clone())
                .collect();
            if navigable.is_empty() {
                true
            } else {
                let clamped = session.index.min(navigable.len() - 1);
                session.index = focused_id
                    .and_then(|id| navigable.iter().position(|n| *n == id))
                    .unwrap_or(clamped);
                false
            }
        };

        if exit {
            log::debug!("Last reviewed file closed, leaving review");
            self.exit();
        } else {
            self.bump();
        }
    }

    /// Leave the review, discarding its comments and decorations
    pub fn exit(&self) {
        let was_active = self.state.lock().session.take().is_some();
        if was_active {
            self.bump();
        }
    }

    /// Whether a review is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// State for the review panel
    #[must_use]
    pub fn snapshot(&self) -> ReviewSnapshot {
        let state = self.state.lock();
        match &state.session {
            Some(session) => ReviewSnapshot {
                active: true,
                scope: Some(session.scope.clone()),
                index: session.index,
                total: session.navigable().len(),
                focused: session.focused().cloned(),
            },
            None => ReviewSnapshot {
                active: false,
                scope: None,
                index: 0,
                total: 0,
                focused: None,
            },
        }
    }

    /// One decoration per navigable comment, the focused one emphasised
    #[must_use]
    pub fn decorations(&self) -> Vec<Decoration> {
        let state = self.state.lock();
        let Some(session) = &state.session else {
            return Vec::new();
        };
        session
            .navigable()
            .into_iter()
            .enumerate()
            .map(|(position, comment)| Decoration {
                decoration_id: DecorationId::new(format!("review-{}", comment.message_id)),
                file: comment.file.clone(),
                range: comment.range,
                style: if position == session.index {
                    DecorationStyle::Highlight
                } else {
                    DecorationStyle::Underline
                },
            })
            .collect()
    }

    /// Observe navigation changes
    #[must_use]
    pub fn watch_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Subscribe to review traffic on the bus
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> Vec<Subscription> {
        let on_comments = Arc::clone(self);
        let on_ended = Arc::clone(self);
        vec![
            bus.on(InboundKind::ReviewComments, move |message| {
                if let InboundMessage::ReviewComments(batch) = message {
                    on_comments.start(batch.scope.clone(), batch.comments.clone());
                }
            }),
            bus.on(InboundKind::SessionEnded, move |_| on_ended.exit()),
        ]
    }

    fn step(&self, step: Step) -> Option<ReviewComment> {
        let (generation, target_index, target) = {
            let state = self.state.lock();
            let session = state.session.as_ref()?;
            let navigable = session.navigable();
            let last = navigable.len().checked_sub(1)?;
            let index = match step {
                Step::Next => (session.index + 1).min(last),
                Step::Previous => session.index.saturating_sub(1),
            };
            if index == session.index {
                return None;
            }
            let target = navigable.get(index).map(|c| (*c).clone())?;
            (session.generation, index, target)
        };

        let needs_switch = self.state.lock().open_file.as_ref() != Some(&target.file);
        if needs_switch {
            self.switch_to(&target.file);
        }

        let mut state = self.state.lock();
        match state.session.as_mut() {
            Some(session) if session.generation == generation => {
                session.index = target_index;
            }
            _ => return None,
        }
        drop(state);
        self.bump();
        Some(target)
    }

    fn switch_to(&self, file: &str) {
        self.opener.open_file(file);
        self.state.lock().open_file = Some(file.to_string());
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl std::fmt::Debug for ReviewNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewNavigator")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
