//! Connection lifecycle state

use std::fmt;

use serde::Serialize;

use crate::types::identifiers::SessionId;
use crate::types::options::DEFAULT_RECONNECT_NOTICE_AFTER;

/// Lifecycle state of the single logical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection and none wanted
    #[default]
    Disconnected,
    /// Transport is opening
    Connecting,
    /// Transport open, waiting for `session:welcome`
    Handshaking,
    /// Handshake done, traffic flows
    Active,
    /// Connection lost, a retry is scheduled
    Reconnecting,
}

impl ConnectionState {
    /// Whether outbound traffic is written right away
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Lowercase name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Active => "active",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the connection as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Lifecycle state
    pub state: ConnectionState,
    /// Consecutive failed attempts since the last time the session was active
    pub reconnect_attempt: u32,
    /// Most recent transport or handshake error
    pub last_error: Option<String>,
    /// Session id from the last welcome
    pub session_id: Option<SessionId>,
    notice_after: u32,
}

impl ConnectionStatus {
    pub(crate) const fn new(notice_after: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            last_error: None,
            session_id: None,
            notice_after,
        }
    }

    /// Whether the reconnect-attempt indicator should be visible
    #[must_use]
    pub const fn show_reconnect_notice(&self) -> bool {
        self.reconnect_attempt >= self.notice_after
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_NOTICE_AFTER)
    }
}
