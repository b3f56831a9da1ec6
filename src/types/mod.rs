//! Type definitions for the coaching client
//!
//! This module contains the type definitions shared across the runtime,
//! organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`MessageId`, `OperationId`, ...)
//! - [`text`] - Line/column ranges, anchors and screen rectangles
//! - [`advice`] - Coaching messages, review comments, decorations, file-tree hints
//! - [`options`] - Runtime configuration

pub mod advice;
pub mod identifiers;
pub mod options;
pub mod text;

// Re-export commonly used types
pub use advice::{
    AdviceKind, CoachingMessage, Decoration, DecorationStyle, FileTreeHint, GlowStyle,
    MessageSource, ReviewComment,
};
pub use identifiers::{DecorationId, MessageId, OperationId, SessionId};
pub use options::{BackoffPolicy, CoachOptions, CoachOptionsBuilder, DebouncePolicy, SendPolicy};
pub use text::{Anchor, ScreenRect, TextRange};
