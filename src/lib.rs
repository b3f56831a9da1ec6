//! # Coaching client runtime
//!
//! Client-side runtime of a desktop coding coach. It keeps one logical
//! WebSocket session to the coaching backend alive, and turns the advisory
//! traffic it receives into render state for the editor: coaching messages,
//! decorations, file-tree glow and review navigation, all governed by a
//! single 0-3 hint level.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kodegen_coach_client::anchors::EditorView;
//! use kodegen_coach_client::review::FileOpener;
//! use kodegen_coach_client::{CoachContext, CoachOptions, ScreenRect, WebSocketTransport};
//! use tokio::sync::watch;
//!
//! struct View(watch::Sender<u64>);
//!
//! impl EditorView for View {
//!     fn resolve(&self, line: u32, _column: u32) -> Option<ScreenRect> {
//!         Some(ScreenRect { top: f64::from(line) * 18.0, left: 0.0, height: 18.0 })
//!     }
//!     fn scroll_events(&self) -> watch::Receiver<u64> {
//!         self.0.subscribe()
//!     }
//! }
//!
//! struct Opener;
//!
//! impl FileOpener for Opener {
//!     fn open_file(&self, file: &str) {
//!         log::info!("open {file}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = CoachOptions::builder()
//!         .server_url("ws://127.0.0.1:7878/ws")
//!         .try_build()?;
//!     let transport = WebSocketTransport::new(options.server_url.clone());
//!     let (scroll, _) = watch::channel(0);
//!
//!     let context = CoachContext::new(transport, options, Arc::new(View(scroll)), Arc::new(Opener));
//!     context.connect();
//!     context.file_opened("src/main.rs");
//!     context.set_hint_level(2);
//!
//!     for rendered in context.coaching().rendered() {
//!         log::info!("{:?}: {}", rendered.mode, rendered.message.body);
//!     }
//!
//!     context.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`session`]: connection lifecycle, backoff, debouncing, pending-operation replay
//! - [`bus`]: type-indexed publish/subscribe with scoped handles
//! - [`hints`]: the hint level and its coordinator
//! - [`coaching`]: coaching message store and render classification
//! - [`anchors`]: anchor positions, decorations, file-tree glow
//! - [`review`]: review navigation state machine
//! - [`context`]: wiring of all of the above
//! - [`protocol`]: wire registry and codec
//! - [`transport`]: WebSocket and in-memory transports
//! - [`types`]: shared data types and configuration
//! - [`error`]: error types
//!
//! ## Error Handling
//!
//! Internal failures use [`CoachError`]. They are logged and folded into
//! state (connection status, dropped frames) rather than returned from the
//! component operations a UI calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod anchors;
pub mod bus;
pub mod coaching;
pub mod context;
pub mod error;
pub mod hints;
pub mod protocol;
pub mod review;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types for external API
pub use anchors::{AnchorTracker, EditorView, FileTreeGlow, edit_invalidates};
pub use bus::{MessageBus, Subscription};
pub use coaching::{CoachingStore, RenderMode, RenderedMessage, render_mode};
pub use context::{CoachContext, EditOutcome};
pub use error::{CoachError, Result};
pub use hints::{HintCoordinator, HintLevel};
pub use protocol::{InboundKind, InboundMessage, OutboundKind, OutboundMessage};
pub use review::{FileOpener, ReviewNavigator, ReviewSnapshot};
pub use session::{
    ConnectionState, ConnectionStatus, DeliveryState, Outbox, PendingOperation, SessionManager,
};
pub use transport::{MemoryServer, MemoryTransport, Transport, WebSocketTransport, memory_pair};

// Re-export type submodules for flat public API
pub use types::advice::{
    AdviceKind, CoachingMessage, Decoration, DecorationStyle, FileTreeHint, GlowStyle,
    MessageSource, ReviewComment,
};
pub use types::identifiers::{DecorationId, MessageId, OperationId, SessionId};
pub use types::options::{
    BackoffPolicy, CoachOptions, CoachOptionsBuilder, DebouncePolicy, SendPolicy,
};
pub use types::text::{Anchor, ScreenRect, TextRange};

/// Version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
