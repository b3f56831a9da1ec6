//! Coaching client options and configuration
//!
//! This module contains the runtime configuration, including a builder
//! pattern for easy configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{CoachError, Result};
use crate::protocol::{ClientCapabilities, OutboundKind};

/// Default backend endpoint
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:7878/ws";

/// Default bound on queued mutations awaiting acknowledgment
pub const DEFAULT_MAX_PENDING_OPERATIONS: usize = 256;

/// Consecutive failures before the UI shows the attempt counter
pub const DEFAULT_RECONNECT_NOTICE_AFTER: u32 = 5;

// ============================================================================
// Send policies
// ============================================================================

/// Coalescing window for a high-frequency message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    /// Quiet period after the last call before the value is emitted
    pub window: Duration,
    /// Ceiling measured from the first call of a burst
    pub max_wait: Option<Duration>,
}

impl DebouncePolicy {
    /// Trailing debounce without a ceiling
    #[must_use]
    pub const fn trailing(window: Duration) -> Self {
        Self {
            window,
            max_wait: None,
        }
    }

    /// Trailing debounce that still flushes every `max_wait` under load
    #[must_use]
    pub const fn with_max_wait(window: Duration, max_wait: Duration) -> Self {
        Self {
            window,
            max_wait: Some(max_wait),
        }
    }
}

/// How `send` treats a message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPolicy {
    /// Written immediately when active, dropped otherwise
    Immediate,
    /// Coalesced per kind and key, emitted when the window closes
    Debounced(DebouncePolicy),
    /// Queued until acknowledged, replayed across outages
    Mutation,
}

/// Reconnection delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial: Duration,
    /// Cap the doubling never exceeds
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Coach Options
// ============================================================================

/// Main options for the coaching client runtime
#[derive(Clone)]
pub struct CoachOptions {
    /// Backend WebSocket endpoint
    pub server_url: String,
    /// Name reported in the handshake
    pub client_name: String,
    /// Per-kind send policy overrides; kinds not listed use their default
    pub send_policies: HashMap<OutboundKind, SendPolicy>,
    /// Reconnection delays
    pub backoff: BackoffPolicy,
    /// Attempts after which the reconnect indicator becomes visible
    pub reconnect_notice_after: u32,
    /// Bound on the pending-operation queue (oldest dropped when full)
    pub max_pending_operations: usize,
    /// Capabilities advertised in the handshake
    pub capabilities: ClientCapabilities,
    /// Emit `session:restore` after every re-activation
    pub restore_on_reconnect: bool,
}

impl Default for CoachOptions {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            client_name: format!("kodegen-coach-client/{}", crate::VERSION),
            send_policies: HashMap::new(),
            backoff: BackoffPolicy::default(),
            reconnect_notice_after: DEFAULT_RECONNECT_NOTICE_AFTER,
            max_pending_operations: DEFAULT_MAX_PENDING_OPERATIONS,
            capabilities: ClientCapabilities::all_features(),
            restore_on_reconnect: true,
        }
    }
}

impl CoachOptions {
    /// Create a new builder for `CoachOptions`
    #[must_use]
    pub fn builder() -> CoachOptionsBuilder {
        CoachOptionsBuilder::default()
    }

    /// Effective send policy for a message kind
    #[must_use]
    pub fn policy_for(&self, kind: OutboundKind) -> SendPolicy {
        self.send_policies
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_policy())
    }

    /// Check the options for values the runtime cannot honour
    ///
    /// # Errors
    /// Returns `CoachError::InvalidConfig` describing the first bad value
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(CoachError::invalid_config("server_url must not be empty"));
        }
        if self.max_pending_operations == 0 {
            return Err(CoachError::invalid_config(
                "max_pending_operations must be at least 1",
            ));
        }
        if self.backoff.initial.is_zero() || self.backoff.max < self.backoff.initial {
            return Err(CoachError::invalid_config(format!(
                "backoff must satisfy 0 < initial <= max (got {:?} / {:?})",
                self.backoff.initial, self.backoff.max
            )));
        }
        for (kind, policy) in &self.send_policies {
            if let SendPolicy::Debounced(debounce) = policy {
                if debounce.window.is_zero() {
                    return Err(CoachError::invalid_config(format!(
                        "debounce window for {} must be non-zero",
                        kind.as_str()
                    )));
                }
                if debounce.max_wait.is_some_and(|max| max < debounce.window) {
                    return Err(CoachError::invalid_config(format!(
                        "max_wait for {} is shorter than its window",
                        kind.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CoachOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachOptions")
            .field("server_url", &self.server_url)
            .field("client_name", &self.client_name)
            .field(
                "send_policies",
                &format!("[{} overrides]", self.send_policies.len()),
            )
            .field("backoff", &self.backoff)
            .field("reconnect_notice_after", &self.reconnect_notice_after)
            .field("max_pending_operations", &self.max_pending_operations)
            .field("capabilities", &self.capabilities)
            .field("restore_on_reconnect", &self.restore_on_reconnect)
            .finish()
    }
}

// ============================================================================
// Builder for CoachOptions
// ============================================================================

/// Builder for `CoachOptions`
#[derive(Debug, Default)]
pub struct CoachOptionsBuilder {
    options: CoachOptions,
}

impl CoachOptionsBuilder {
    /// Set the backend endpoint
    #[must_use]
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.options.server_url = url.into();
        self
    }

    /// Set the client name reported in the handshake
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.options.client_name = name.into();
        self
    }

    /// Override the send policy of one message kind
    #[must_use]
    pub fn send_policy(mut self, kind: OutboundKind, policy: SendPolicy) -> Self {
        self.options.send_policies.insert(kind, policy);
        self
    }

    /// Set reconnection delays
    #[must_use]
    pub const fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.options.backoff = BackoffPolicy { initial, max };
        self
    }

    /// Set the attempt count after which the reconnect indicator shows
    #[must_use]
    pub const fn reconnect_notice_after(mut self, attempts: u32) -> Self {
        self.options.reconnect_notice_after = attempts;
        self
    }

    /// Set the pending-operation bound
    #[must_use]
    pub const fn max_pending_operations(mut self, max: usize) -> Self {
        self.options.max_pending_operations = max;
        self
    }

    /// Set advertised capabilities
    #[must_use]
    pub const fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.options.capabilities = capabilities;
        self
    }

    /// Enable or disable the synthetic restore request on reconnect
    #[must_use]
    pub const fn restore_on_reconnect(mut self, enabled: bool) -> Self {
        self.options.restore_on_reconnect = enabled;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> CoachOptions {
        self.options
    }

    /// Build the options, rejecting values the runtime cannot honour
    ///
    /// # Errors
    /// Returns `CoachError::InvalidConfig` if validation fails
    pub fn try_build(self) -> Result<CoachOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
