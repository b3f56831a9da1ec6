//! Wire message types
//!
//! Every message kind has exactly one variant here. The serde tags double as
//! the wire registry: `type` carries the tag and `payload` the variant body.

use serde::{Deserialize, Serialize};

use crate::types::advice::{CoachingMessage, Decoration, FileTreeHint, ReviewComment};
use crate::types::identifiers::{DecorationId, MessageId, OperationId, SessionId};
use crate::types::text::TextRange;

use super::capabilities::ClientCapabilities;

// ============================================================================
// Inbound (server -> client)
// ============================================================================

/// Message received from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InboundMessage {
    /// Handshake accepted
    #[serde(rename = "session:welcome")]
    Welcome(Welcome),
    /// Reply to a restore request
    #[serde(rename = "session:restored")]
    Restored(SessionRestored),
    /// Backend ended the coaching session
    #[serde(rename = "session:ended")]
    SessionEnded {},
    /// Mutation acknowledged
    #[serde(rename = "ack")]
    Ack(Ack),
    /// Application-level error
    #[serde(rename = "error")]
    Error(ServerError),
    /// Backend-pushed hint level
    #[serde(rename = "hints:level")]
    HintLevel(HintLevelUpdate),
    /// New coaching message
    #[serde(rename = "coaching:message")]
    CoachingMessage(CoachingMessage),
    /// Remove coaching messages
    #[serde(rename = "coaching:clear")]
    CoachingClear(CoachingClear),
    /// Workflow phase moved on
    #[serde(rename = "phase:changed")]
    PhaseChanged(PhaseChanged),
    /// Add an editor decoration
    #[serde(rename = "decoration:add")]
    DecorationAdd(Decoration),
    /// Remove editor decorations
    #[serde(rename = "decoration:clear")]
    DecorationClear(DecorationClear),
    /// Make part of the file tree glow
    #[serde(rename = "filetree:hint")]
    FileTreeHint(FileTreeHint),
    /// Reset all file-tree glow
    #[serde(rename = "filetree:clear")]
    FileTreeClear {},
    /// Batch of review comments
    #[serde(rename = "review:comments")]
    ReviewComments(ReviewBatch),
    /// File persisted by the backend
    #[serde(rename = "file:saved")]
    FileSaved(FileRef),
    /// Keepalive reply
    #[serde(rename = "pong")]
    Pong {},
}

/// Handshake acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    /// Backend session id
    pub session_id: SessionId,
    /// Protocol version the backend speaks
    pub protocol_version: String,
    /// Backend build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
}

/// Session state returned after a restore request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionRestored {
    /// Hint level stored by the backend, unclamped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_level: Option<i64>,
    /// Current workflow phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Acknowledgment of a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Operation being acknowledged
    pub operation_id: OperationId,
}

/// Application-level error reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Machine-readable code, e.g. `file_not_found`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Operation this error answers, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<OperationId>,
}

/// Backend-pushed hint level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintLevelUpdate {
    /// Level, unclamped
    pub level: i64,
}

/// Bulk removal of coaching messages
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoachingClear {
    /// Ids to remove; absent means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ids: Option<Vec<MessageId>>,
}

/// Workflow phase transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChanged {
    /// Name of the new phase
    pub phase: String,
}

/// Bulk removal of decorations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecorationClear {
    /// Ids to remove; absent means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoration_ids: Option<Vec<DecorationId>>,
}

/// Review comments for one scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewBatch {
    /// What was reviewed (file, selection, diff, ...)
    pub scope: String,
    /// Comments in navigation order
    pub comments: Vec<ReviewComment>,
}

/// Single file reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Workspace-relative path
    pub file: String,
}

// ============================================================================
// Outbound (client -> server)
// ============================================================================

/// Message sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundMessage {
    /// Handshake opener
    #[serde(rename = "session:hello")]
    Hello(Hello),
    /// Ask the backend to resend session state
    #[serde(rename = "session:restore")]
    Restore(RestoreRequest),
    /// Begin a coaching session
    #[serde(rename = "session:start")]
    SessionStart(SessionStart),
    /// End the coaching session
    #[serde(rename = "session:end")]
    SessionEnd {},
    /// Buffer contents changed
    #[serde(rename = "editor:content_update")]
    ContentUpdate(ContentUpdate),
    /// Viewport moved
    #[serde(rename = "editor:scroll_position")]
    ScrollPosition(ScrollPosition),
    /// User went quiet
    #[serde(rename = "editor:idle")]
    Idle(IdleNotice),
    /// File opened in the editor
    #[serde(rename = "editor:file_open")]
    FileOpen(FileRef),
    /// File closed in the editor
    #[serde(rename = "editor:file_close")]
    FileClose(FileRef),
    /// Persist a buffer
    #[serde(rename = "editor:save")]
    Save(SaveFile),
    /// Create a file
    #[serde(rename = "file:create")]
    FileCreate(PathRef),
    /// Delete a file
    #[serde(rename = "file:delete")]
    FileDelete(PathRef),
    /// Rename a file
    #[serde(rename = "file:rename")]
    FileRename(FileRename),
    /// Hint level changed locally
    #[serde(rename = "hints:level_change")]
    HintLevelChange(HintLevelChange),
    /// Ask for an explanation of a span
    #[serde(rename = "coaching:explain")]
    Explain(ExplainRequest),
    /// User dismissed a coaching message
    #[serde(rename = "coaching:dismiss")]
    Dismiss(DismissRequest),
    /// Ask for a review
    #[serde(rename = "review:request")]
    ReviewRequest(ReviewRequest),
    /// Move to the next workflow phase
    #[serde(rename = "phase:advance")]
    PhaseAdvance {},
    /// Keepalive
    #[serde(rename = "ping")]
    Ping {},
}

/// Handshake opener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Client build
    pub client_name: String,
    /// Protocol version spoken by the client
    pub protocol_version: String,
    /// Advertised capabilities
    pub capabilities: ClientCapabilities,
}

/// Restore request emitted after reconnecting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Session the client was attached to before the outage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Session start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStart {
    /// Workspace root
    pub workspace: String,
}

/// Full buffer contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    /// Edited file
    pub file: String,
    /// Current contents
    pub content: String,
}

/// Visible line window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollPosition {
    /// Scrolled file
    pub file: String,
    /// First visible line
    pub top_line: u32,
    /// Last visible line
    pub bottom_line: u32,
}

/// Idle notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleNotice {
    /// File focused when activity stopped
    pub file: String,
    /// Quiet time before the notice was emitted
    pub idle_ms: u64,
}

/// Save request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Saved file
    pub file: String,
    /// Contents to persist
    pub content: String,
}

/// Path reference for file operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRef {
    /// Workspace-relative path
    pub path: String,
}

/// Rename request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRename {
    /// Current path
    pub from: String,
    /// New path
    pub to: String,
}

/// Local hint level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintLevelChange {
    /// New level, already clamped
    pub level: u8,
}

/// Explain request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainRequest {
    /// File containing the span
    pub file: String,
    /// Span to explain
    pub range: TextRange,
    /// Selected text, when the editor has it at hand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

/// Dismissal notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissRequest {
    /// Dismissed message
    pub message_id: MessageId,
}

/// Review request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// What to review
    pub scope: String,
}

impl OutboundMessage {
    /// Coalescing key within a kind
    ///
    /// Per-file kinds coalesce per file; everything else has a single slot.
    #[must_use]
    pub fn debounce_key(&self) -> &str {
        match self {
            Self::ContentUpdate(ContentUpdate { file, .. })
            | Self::ScrollPosition(ScrollPosition { file, .. })
            | Self::Idle(IdleNotice { file, .. }) => file,
            _ => "",
        }
    }
}
