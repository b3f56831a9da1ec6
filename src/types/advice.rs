//! Advisory payload types
//!
//! Coaching messages, review comments, decorations and file-tree hints as
//! they arrive from the backend. Tags the runtime does not recognise decode
//! to an `Unknown` variant and render with the most visible treatment.

use serde::{Deserialize, Serialize};

use super::identifiers::{DecorationId, MessageId};
use super::text::{Anchor, TextRange};

// ============================================================================
// Tags
// ============================================================================

/// Who asked for a coaching message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    /// Ambient guidance the backend volunteered
    #[default]
    Coaching,
    /// Answer to a user "explain" request
    Explain,
    /// Output of the observer the user switched on
    Observer,
    /// Unrecognised source tag
    #[serde(other)]
    Unknown,
}

impl MessageSource {
    /// Whether the user explicitly asked for this content
    ///
    /// Unknown sources count as requested so they are never hidden.
    #[must_use]
    pub const fn is_user_requested(self) -> bool {
        !matches!(self, Self::Coaching)
    }
}

/// Severity / flavour of an advisory message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceKind {
    /// Gentle nudge
    #[default]
    Hint,
    /// Concrete improvement
    Suggestion,
    /// Likely problem
    Warning,
    /// Definite problem
    Error,
    /// Positive feedback
    Praise,
    /// Neutral information
    Info,
    /// Unrecognised tag
    #[serde(other)]
    Unknown,
}

impl AdviceKind {
    /// Tag as rendered to the UI; unknown tags take the loudest treatment
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Unknown => Self::Error,
            other => other,
        }
    }
}

// ============================================================================
// Coaching messages and review comments
// ============================================================================

/// Advisory message from the coaching backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingMessage {
    /// Stable id, the dedup key
    pub message_id: MessageId,
    /// Message text
    pub body: String,
    /// Severity tag
    #[serde(rename = "type", default)]
    pub kind: AdviceKind,
    /// Code location, absent for ambient messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    /// Origin of the message
    #[serde(default)]
    pub source: MessageSource,
}

impl CoachingMessage {
    /// Create an ambient coaching message
    pub fn ambient(message_id: impl Into<MessageId>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            kind: AdviceKind::Hint,
            anchor: None,
            source: MessageSource::Coaching,
        }
    }

    /// Create a coaching message anchored to a file span
    pub fn anchored(
        message_id: impl Into<MessageId>,
        body: impl Into<String>,
        anchor: Anchor,
    ) -> Self {
        Self {
            anchor: Some(anchor),
            ..Self::ambient(message_id, body)
        }
    }

    /// Replace the source tag
    #[must_use]
    pub const fn with_source(mut self, source: MessageSource) -> Self {
        self.source = source;
        self
    }

    /// Replace the severity tag
    #[must_use]
    pub const fn with_kind(mut self, kind: AdviceKind) -> Self {
        self.kind = kind;
        self
    }
}

/// One comment of a review batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Stable id of the comment
    pub message_id: MessageId,
    /// File the comment refers to
    pub file: String,
    /// Commented span
    pub range: TextRange,
    /// Comment text
    pub body: String,
    /// Severity tag
    #[serde(rename = "type", default)]
    pub kind: AdviceKind,
}

// ============================================================================
// Decorations and file-tree hints
// ============================================================================

/// Editor decoration treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorationStyle {
    /// Squiggle under the span
    #[default]
    Underline,
    /// Background highlight
    Highlight,
    /// Gutter marker only
    Gutter,
    /// Unrecognised tag
    #[serde(other)]
    Unknown,
}

impl DecorationStyle {
    /// Style as rendered; unknown tags take the most visible treatment
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Unknown => Self::Highlight,
            other => other,
        }
    }
}

/// Backend-requested editor decoration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    /// Decoration id
    pub decoration_id: DecorationId,
    /// Decorated file
    pub file: String,
    /// Decorated span
    pub range: TextRange,
    /// Visual treatment
    #[serde(default)]
    pub style: DecorationStyle,
}

/// How loudly a file-tree hint propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlowStyle {
    /// The file only
    Subtle,
    /// The file plus listed directories
    Obvious,
    /// The file plus every ancestor directory
    Unmissable,
    /// Unrecognised tag
    #[serde(other)]
    Unknown,
}

impl GlowStyle {
    /// Style as applied; unknown tags propagate as far as possible
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Unknown => Self::Unmissable,
            other => other,
        }
    }
}

/// Backend request to make part of the file tree glow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTreeHint {
    /// Target file
    pub file: String,
    /// Propagation style
    pub style: GlowStyle,
    /// Directories to light for `obvious`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<String>,
}
