//! Error types for the coaching client runtime
//!
//! These errors live inside the runtime (transport, codec, configuration).
//! Public component operations never surface them as failures of a user
//! action; they are logged and folded into state instead.

use thiserror::Error;

/// Main error type for the coaching client
#[derive(Error, Debug)]
pub enum CoachError {
    /// Connection could not be established or was refused
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport layer error on an established connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON decode error when parsing a frame
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Envelope or payload did not match the expected shape
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// Envelope carried a tag outside the registry
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// Handshake or protocol rule violation
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Background task or channel has gone away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

/// Result type alias for coaching client operations
pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create an unknown message type error
    pub fn unknown_message_type(tag: impl Into<String>) -> Self {
        Self::UnknownMessageType(tag.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a channel closed error
    pub fn channel_closed(msg: impl Into<String>) -> Self {
        Self::ChannelClosed(msg.into())
    }

    /// Whether this error should end the current connection
    ///
    /// Parse-level errors drop a single frame; everything else is treated as
    /// a lost connection by the session driver.
    #[must_use]
    pub const fn is_connection_fatal(&self) -> bool {
        !matches!(
            self,
            Self::JsonDecode(_) | Self::MessageParse { .. } | Self::UnknownMessageType(_)
        )
    }
}
