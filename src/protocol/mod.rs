//! Wire protocol between the coaching client and its backend
//!
//! Every frame is a JSON envelope:
//!
//! ```text
//! { "type": "<tag>", "payload": { ... }, "id": "<correlation>", "timestamp": 1700000000000 }
//! ```
//!
//! `type` belongs to a closed, versioned registry split into inbound and
//! outbound tags ([`InboundKind`], [`OutboundKind`]). Each tag has one
//! variant in [`InboundMessage`] / [`OutboundMessage`], and all decoding goes
//! through [`decode_frame`], so unknown tags and malformed payloads hit one
//! well-defined fallback.
//!
//! # Example: Decoding a frame
//!
//! ```rust
//! use kodegen_coach_client::protocol::{decode_frame, InboundMessage};
//!
//! let frame = r#"{"type":"hints:level","payload":{"level":2},"timestamp":0}"#;
//! let received = decode_frame(frame).unwrap();
//! assert!(matches!(received.message, InboundMessage::HintLevel(update) if update.level == 2));
//!
//! assert!(decode_frame(r#"{"type":"made:up","payload":{}}"#).is_err());
//! ```
//!
//! # Example: Encoding a message
//!
//! ```rust
//! use kodegen_coach_client::protocol::{encode_message, HintLevelChange, OutboundMessage};
//!
//! let frame = encode_message(
//!     &OutboundMessage::HintLevelChange(HintLevelChange { level: 1 }),
//!     None,
//! )
//! .unwrap();
//! assert!(frame.contains(r#""type":"hints:level_change""#));
//! ```

mod capabilities;
mod codec;
mod kinds;
mod messages;

// Re-export public types
pub use capabilities::ClientCapabilities;
pub use codec::{
    Envelope, PROTOCOL_VERSION, Received, check_welcome, decode_frame, encode_envelope,
    encode_message, hello,
};
pub use kinds::{InboundKind, OutboundKind};
pub use messages::{
    Ack, CoachingClear, ContentUpdate, DecorationClear, DismissRequest, ExplainRequest, FileRef,
    FileRename, Hello, HintLevelChange, HintLevelUpdate, IdleNotice, InboundMessage,
    OutboundMessage, PathRef, PhaseChanged, RestoreRequest, ReviewBatch, ReviewRequest, SaveFile,
    ScrollPosition, ServerError, SessionRestored, SessionStart, Welcome,
};
