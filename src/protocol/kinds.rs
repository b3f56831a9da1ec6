//! Message kind registry
//!
//! Fieldless mirrors of the message enums. They index the message bus and
//! the send policies, and decide whether an incoming tag is known at all.

use std::fmt;
use std::time::Duration;

use crate::types::options::{DebouncePolicy, SendPolicy};

use super::messages::{InboundMessage, OutboundMessage};

/// Kind of an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    /// `session:welcome`
    Welcome,
    /// `session:restored`
    Restored,
    /// `session:ended`
    SessionEnded,
    /// `ack`
    Ack,
    /// `error`
    Error,
    /// `hints:level`
    HintLevel,
    /// `coaching:message`
    CoachingMessage,
    /// `coaching:clear`
    CoachingClear,
    /// `phase:changed`
    PhaseChanged,
    /// `decoration:add`
    DecorationAdd,
    /// `decoration:clear`
    DecorationClear,
    /// `filetree:hint`
    FileTreeHint,
    /// `filetree:clear`
    FileTreeClear,
    /// `review:comments`
    ReviewComments,
    /// `file:saved`
    FileSaved,
    /// `pong`
    Pong,
}

impl InboundKind {
    /// Every inbound kind, in registry order
    pub const ALL: [Self; 16] = [
        Self::Welcome,
        Self::Restored,
        Self::SessionEnded,
        Self::Ack,
        Self::Error,
        Self::HintLevel,
        Self::CoachingMessage,
        Self::CoachingClear,
        Self::PhaseChanged,
        Self::DecorationAdd,
        Self::DecorationClear,
        Self::FileTreeHint,
        Self::FileTreeClear,
        Self::ReviewComments,
        Self::FileSaved,
        Self::Pong,
    ];

    /// Wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "session:welcome",
            Self::Restored => "session:restored",
            Self::SessionEnded => "session:ended",
            Self::Ack => "ack",
            Self::Error => "error",
            Self::HintLevel => "hints:level",
            Self::CoachingMessage => "coaching:message",
            Self::CoachingClear => "coaching:clear",
            Self::PhaseChanged => "phase:changed",
            Self::DecorationAdd => "decoration:add",
            Self::DecorationClear => "decoration:clear",
            Self::FileTreeHint => "filetree:hint",
            Self::FileTreeClear => "filetree:clear",
            Self::ReviewComments => "review:comments",
            Self::FileSaved => "file:saved",
            Self::Pong => "pong",
        }
    }

    /// Look up a wire tag; `None` for tags outside the registry
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for InboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InboundMessage {
    /// Registry kind of this message
    #[must_use]
    pub const fn kind(&self) -> InboundKind {
        match self {
            Self::Welcome(_) => InboundKind::Welcome,
            Self::Restored(_) => InboundKind::Restored,
            Self::SessionEnded {} => InboundKind::SessionEnded,
            Self::Ack(_) => InboundKind::Ack,
            Self::Error(_) => InboundKind::Error,
            Self::HintLevel(_) => InboundKind::HintLevel,
            Self::CoachingMessage(_) => InboundKind::CoachingMessage,
            Self::CoachingClear(_) => InboundKind::CoachingClear,
            Self::PhaseChanged(_) => InboundKind::PhaseChanged,
            Self::DecorationAdd(_) => InboundKind::DecorationAdd,
            Self::DecorationClear(_) => InboundKind::DecorationClear,
            Self::FileTreeHint(_) => InboundKind::FileTreeHint,
            Self::FileTreeClear {} => InboundKind::FileTreeClear,
            Self::ReviewComments(_) => InboundKind::ReviewComments,
            Self::FileSaved(_) => InboundKind::FileSaved,
            Self::Pong {} => InboundKind::Pong,
        }
    }
}

/// Kind of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    /// `session:hello`
    Hello,
    /// `session:restore`
    Restore,
    /// `session:start`
    SessionStart,
    /// `session:end`
    SessionEnd,
    /// `editor:content_update`
    ContentUpdate,
    /// `editor:scroll_position`
    ScrollPosition,
    /// `editor:idle`
    Idle,
    /// `editor:file_open`
    FileOpen,
    /// `editor:file_close`
    FileClose,
    /// `editor:save`
    Save,
    /// `file:create`
    FileCreate,
    /// `file:delete`
    FileDelete,
    /// `file:rename`
    FileRename,
    /// `hints:level_change`
    HintLevelChange,
    /// `coaching:explain`
    Explain,
    /// `coaching:dismiss`
    Dismiss,
    /// `review:request`
    ReviewRequest,
    /// `phase:advance`
    PhaseAdvance,
    /// `ping`
    Ping,
}

impl OutboundKind {
    /// Every outbound kind, in registry order
    pub const ALL: [Self; 19] = [
        Self::Hello,
        Self::Restore,
        Self::SessionStart,
        Self::SessionEnd,
        Self::ContentUpdate,
        Self::ScrollPosition,
        Self::Idle,
        Self::FileOpen,
        Self::FileClose,
        Self::Save,
        Self::FileCreate,
        Self::FileDelete,
        Self::FileRename,
        Self::HintLevelChange,
        Self::Explain,
        Self::Dismiss,
        Self::ReviewRequest,
        Self::PhaseAdvance,
        Self::Ping,
    ];

    /// Wire tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hello => "session:hello",
            Self::Restore => "session:restore",
            Self::SessionStart => "session:start",
            Self::SessionEnd => "session:end",
            Self::ContentUpdate => "editor:content_update",
            Self::ScrollPosition => "editor:scroll_position",
            Self::Idle => "editor:idle",
            Self::FileOpen => "editor:file_open",
            Self::FileClose => "editor:file_close",
            Self::Save => "editor:save",
            Self::FileCreate => "file:create",
            Self::FileDelete => "file:delete",
            Self::FileRename => "file:rename",
            Self::HintLevelChange => "hints:level_change",
            Self::Explain => "coaching:explain",
            Self::Dismiss => "coaching:dismiss",
            Self::ReviewRequest => "review:request",
            Self::PhaseAdvance => "phase:advance",
            Self::Ping => "ping",
        }
    }

    /// Built-in send policy for this kind
    #[must_use]
    pub const fn default_policy(self) -> SendPolicy {
        match self {
            Self::ContentUpdate => SendPolicy::Debounced(DebouncePolicy::with_max_wait(
                Duration::from_millis(300),
                Duration::from_millis(5000),
            )),
            Self::ScrollPosition | Self::HintLevelChange => {
                SendPolicy::Debounced(DebouncePolicy::trailing(Duration::from_millis(200)))
            }
            Self::Idle => {
                SendPolicy::Debounced(DebouncePolicy::trailing(Duration::from_millis(5000)))
            }
            Self::Save
            | Self::FileCreate
            | Self::FileDelete
            | Self::FileRename
            | Self::Explain
            | Self::Dismiss
            | Self::ReviewRequest => SendPolicy::Mutation,
            Self::Hello
            | Self::Restore
            | Self::SessionStart
            | Self::SessionEnd
            | Self::FileOpen
            | Self::FileClose
            | Self::PhaseAdvance
            | Self::Ping => SendPolicy::Immediate,
        }
    }
}

impl fmt::Display for OutboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutboundMessage {
    /// Registry kind of this message
    #[must_use]
    pub const fn kind(&self) -> OutboundKind {
        match self {
            Self::Hello(_) => OutboundKind::Hello,
            Self::Restore(_) => OutboundKind::Restore,
            Self::SessionStart(_) => OutboundKind::SessionStart,
            Self::SessionEnd {} => OutboundKind::SessionEnd,
            Self::ContentUpdate(_) => OutboundKind::ContentUpdate,
            Self::ScrollPosition(_) => OutboundKind::ScrollPosition,
            Self::Idle(_) => OutboundKind::Idle,
            Self::FileOpen(_) => OutboundKind::FileOpen,
            Self::FileClose(_) => OutboundKind::FileClose,
            Self::Save(_) => OutboundKind::Save,
            Self::FileCreate(_) => OutboundKind::FileCreate,
            Self::FileDelete(_) => OutboundKind::FileDelete,
            Self::FileRename(_) => OutboundKind::FileRename,
            Self::HintLevelChange(_) => OutboundKind::HintLevelChange,
            Self::Explain(_) => OutboundKind::Explain,
            Self::Dismiss(_) => OutboundKind::Dismiss,
            Self::ReviewRequest(_) => OutboundKind::ReviewRequest,
            Self::PhaseAdvance {} => OutboundKind::PhaseAdvance,
            Self::Ping {} => OutboundKind::Ping,
        }
    }
}
