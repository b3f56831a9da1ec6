//! Explicitly constructed runtime context
//!
//! [`CoachContext`] builds every subsystem around one [`SessionManager`]
//! and one [`MessageBus`], wires their bus subscriptions, and exposes the
//! action senders and editor hooks a host UI calls into.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::anchors::{AnchorTracker, EditorView, FileTreeGlow};
use crate::bus::{MessageBus, Subscription};
use crate::coaching::CoachingStore;
use crate::error::Result;
use crate::hints::{HintCoordinator, HintLevel};
use crate::protocol::{
    ContentUpdate, ExplainRequest, FileRef, FileRename, IdleNotice, InboundKind, OutboundKind,
    OutboundMessage, PathRef, ReviewRequest, SaveFile, ScrollPosition, SessionStart,
};
use crate::review::{FileOpener, ReviewNavigator};
use crate::session::{Outbox, SessionManager};
use crate::transport::Transport;
use crate::types::identifiers::{DecorationId, MessageId, OperationId};
use crate::types::options::{CoachOptions, SendPolicy};
use crate::types::text::TextRange;

/// Result of applying an edit to anchored state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Coaching messages dismissed by the edit
    pub messages: Vec<MessageId>,
    /// Decorations dismissed by the edit
    pub decorations: Vec<DecorationId>,
}

/// Every subsystem of the coaching client, wired together
pub struct CoachContext {
    session: SessionManager,
    hints: Arc<HintCoordinator>,
    coaching: Arc<CoachingStore>,
    anchors: Arc<AnchorTracker>,
    glow: Arc<FileTreeGlow>,
    review: Arc<ReviewNavigator>,
    subscriptions: Mutex<Vec<Subscription>>,
    scroll_task: Mutex<Option<JoinHandle<()>>>,
}

impl CoachContext {
    /// Build the runtime over a transport and the editor's capabilities
    ///
    /// Must be called from within a Tokio runtime. Nothing connects until
    /// [`connect`](Self::connect) is called.
    pub fn new<T: Transport>(
        transport: T,
        options: CoachOptions,
        view: Arc<dyn EditorView>,
        opener: Arc<dyn FileOpener>,
    ) -> Self {
        let bus = MessageBus::new();
        let session = SessionManager::new(transport, options, bus.clone());
        let outbox: Arc<dyn Outbox> = Arc::new(session.clone());

        let hints = Arc::new(HintCoordinator::new(Arc::clone(&outbox)));
        let coaching = Arc::new(CoachingStore::new(Arc::clone(&hints), outbox));
        let anchors = Arc::new(AnchorTracker::new(view));
        let glow = Arc::new(FileTreeGlow::new());
        let review = Arc::new(ReviewNavigator::new(opener));

        let mut subscriptions = Vec::new();
        subscriptions.extend(hints.attach(&bus));
        subscriptions.extend(coaching.attach(&bus));
        subscriptions.extend(anchors.attach(&bus));
        subscriptions.extend(glow.attach(&bus));
        subscriptions.extend(review.attach(&bus));

        // Registered after the store so the tracker sees the updated set
        for kind in [
            InboundKind::CoachingMessage,
            InboundKind::CoachingClear,
            InboundKind::PhaseChanged,
            InboundKind::SessionEnded,
        ] {
            let coaching = Arc::clone(&coaching);
            let anchors = Arc::clone(&anchors);
            subscriptions.push(bus.on(kind, move |_| {
                anchors.set_visible_messages(&coaching.messages());
            }));
        }

        let scroll_task = anchors.watch_scroll();

        Self {
            session,
            hints,
            coaching,
            anchors,
            glow,
            review,
            subscriptions: Mutex::new(subscriptions),
            scroll_task: Mutex::new(Some(scroll_task)),
        }
    }

    // ------------------------------------------------------------------
    // Subsystems
    // ------------------------------------------------------------------

    /// Connection handle
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Bus carrying inbound traffic
    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        self.session.bus()
    }

    /// Hint level owner
    #[must_use]
    pub fn hints(&self) -> &Arc<HintCoordinator> {
        &self.hints
    }

    /// Coaching message store
    #[must_use]
    pub fn coaching(&self) -> &Arc<CoachingStore> {
        &self.coaching
    }

    /// Anchor and decoration tracker
    #[must_use]
    pub fn anchors(&self) -> &Arc<AnchorTracker> {
        &self.anchors
    }

    /// File-tree glow
    #[must_use]
    pub fn glow(&self) -> &Arc<FileTreeGlow> {
        &self.glow
    }

    /// Review navigator
    #[must_use]
    pub fn review(&self) -> &Arc<ReviewNavigator> {
        &self.review
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Open the backend connection
    pub fn connect(&self) {
        self.session.connect();
    }

    /// Begin a coaching session for a workspace
    pub fn start_session(&self, workspace: impl Into<String>) {
        self.session
            .send(OutboundMessage::SessionStart(SessionStart {
                workspace: workspace.into(),
            }));
    }

    /// End the coaching session
    ///
    /// The review exits and the coaching store empties right away, whether
    /// or not the backend hears about it.
    pub fn end_session(&self) {
        self.review.exit();
        self.coaching.reset();
        self.sync_anchors();
        self.session.send(OutboundMessage::SessionEnd {});
    }

    /// Ask the backend to move to the next phase
    pub fn advance_phase(&self) {
        self.session.send(OutboundMessage::PhaseAdvance {});
    }

    /// Change the hint level
    pub fn set_hint_level(&self, level: i64) -> HintLevel {
        self.hints.set_level(level)
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Ask for an explanation of a span
    pub fn request_explain(
        &self,
        file: impl Into<String>,
        range: TextRange,
        selection: Option<String>,
    ) -> Option<OperationId> {
        self.session.send(OutboundMessage::Explain(ExplainRequest {
            file: file.into(),
            range,
            selection,
        }))
    }

    /// Ask for a review
    pub fn request_review(&self, scope: impl Into<String>) -> Option<OperationId> {
        self.session
            .send(OutboundMessage::ReviewRequest(ReviewRequest {
                scope: scope.into(),
            }))
    }

    /// Dismiss a coaching message
    pub fn dismiss(&self, id: &MessageId) -> bool {
        let dismissed = self.coaching.dismiss(id);
        if dismissed {
            self.sync_anchors();
        }
        dismissed
    }

    /// Expand a collapsed coaching message
    pub fn expand(&self, id: &MessageId) -> bool {
        self.coaching.expand(id)
    }

    // ------------------------------------------------------------------
    // Editor hooks
    // ------------------------------------------------------------------

    /// Buffer contents changed
    pub fn content_changed(&self, file: impl Into<String>, content: impl Into<String>) {
        self.session
            .send(OutboundMessage::ContentUpdate(ContentUpdate {
                file: file.into(),
                content: content.into(),
            }));
    }

    /// Viewport moved to show `top_line..=bottom_line`
    pub fn scrolled(&self, file: impl Into<String>, top_line: u32, bottom_line: u32) {
        self.session
            .send(OutboundMessage::ScrollPosition(ScrollPosition {
                file: file.into(),
                top_line,
                bottom_line,
            }));
    }

    /// User activity in a file
    ///
    /// Restarts the idle window; the backend gets `editor:idle` once the
    /// window passes without further activity.
    pub fn activity(&self, file: impl Into<String>) {
        let idle_ms = match self.session.options().policy_for(OutboundKind::Idle) {
            SendPolicy::Debounced(policy) => {
                u64::try_from(policy.window.as_millis()).unwrap_or(u64::MAX)
            }
            SendPolicy::Immediate | SendPolicy::Mutation => 0,
        };
        self.session.send(OutboundMessage::Idle(IdleNotice {
            file: file.into(),
            idle_ms,
        }));
    }

    /// Persist a buffer
    pub fn save(&self, file: impl Into<String>, content: impl Into<String>) -> Option<OperationId> {
        self.session.send(OutboundMessage::Save(SaveFile {
            file: file.into(),
            content: content.into(),
        }))
    }

    /// Create a file
    pub fn create_file(&self, path: impl Into<String>) -> Option<OperationId> {
        self.session
            .send(OutboundMessage::FileCreate(PathRef { path: path.into() }))
    }

    /// Delete a file
    pub fn delete_file(&self, path: impl Into<String>) -> Option<OperationId> {
        self.session
            .send(OutboundMessage::FileDelete(PathRef { path: path.into() }))
    }

    /// Rename a file
    pub fn rename_file(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Option<OperationId> {
        self.session.send(OutboundMessage::FileRename(FileRename {
            from: from.into(),
            to: to.into(),
        }))
    }

    /// A file became the active editor
    pub fn file_opened(&self, file: impl Into<String>) {
        let file = file.into();
        self.anchors.set_active_file(Some(file.clone()));
        self.review.on_file_opened(&file);
        self.session.send(OutboundMessage::FileOpen(FileRef { file }));
    }

    /// A file was closed
    pub fn file_closed(&self, file: impl Into<String>) {
        let file = file.into();
        if self.anchors.active_file().as_deref() == Some(file.as_str()) {
            self.anchors.set_active_file(None);
        }
        self.review.on_file_closed(&file);
        self.session.send(OutboundMessage::FileClose(FileRef { file }));
    }

    /// An edit landed in `file`; dismiss whatever it overlaps
    pub fn edit_applied(&self, file: &str, range: TextRange) -> EditOutcome {
        let outcome = EditOutcome {
            messages: self.coaching.apply_edit(file, &range),
            decorations: self.anchors.apply_edit(file, &range),
        };
        if !outcome.messages.is_empty() {
            self.sync_anchors();
        }
        outcome
    }

    /// Release subscriptions and stop the session driver
    ///
    /// # Errors
    /// Returns error if the driver has already stopped
    pub async fn shutdown(&self) -> Result<()> {
        self.release();
        self.session.shutdown().await
    }

    fn sync_anchors(&self) {
        self.anchors.set_visible_messages(&self.coaching.messages());
    }

    fn release(&self) {
        self.subscriptions.lock().clear();
        if let Some(task) = self.scroll_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for CoachContext {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CoachContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachContext")
            .field("session", &self.session)
            .field("hints", &self.hints)
            .field("coaching", &self.coaching)
            .field("review", &self.review)
            .finish_non_exhaustive()
    }
}
