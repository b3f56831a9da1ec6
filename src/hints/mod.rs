//! Hint level coordination
//!
//! [`HintCoordinator`] is the single writer of the 0-3 disclosure level.
//! Local changes apply synchronously and notify the backend through the
//! `hints:level_change` send policy (a 200 ms trailing debounce by
//! default). Levels pushed by the backend are applied without echoing them
//! back.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::bus::{MessageBus, Subscription};
use crate::protocol::{HintLevelChange, InboundKind, InboundMessage, OutboundMessage};
use crate::session::Outbox;

/// Disclosure level in `0..=3`
///
/// 0 shows the least, 3 the most. At level 2 and above anchored coaching
/// messages render in full.
///
/// Out-of-range values from the wire clamp like [`HintLevel::clamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct HintLevel(u8);

impl HintLevel {
    /// Lowest level
    pub const MIN: Self = Self(0);
    /// Highest level
    pub const MAX: Self = Self(3);
    /// Level a fresh session starts at
    pub const DEFAULT: Self = Self(1);
    /// Level from which anchored messages render in full
    pub const FULL_DETAIL: Self = Self(2);

    /// Clamp any integer into range
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn clamp(level: i64) -> Self {
        if level <= 0 {
            Self::MIN
        } else if level >= 3 {
            Self::MAX
        } else {
            Self(level as u8)
        }
    }

    /// Numeric value
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for HintLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for HintLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for HintLevel {
    fn from(level: i64) -> Self {
        Self::clamp(level)
    }
}

impl From<HintLevel> for u8 {
    fn from(level: HintLevel) -> Self {
        level.0
    }
}

/// Owner of the current hint level
pub struct HintCoordinator {
    level: watch::Sender<HintLevel>,
    outbox: Arc<dyn Outbox>,
}

impl HintCoordinator {
    /// Create a coordinator at the default level
    pub fn new(outbox: Arc<dyn Outbox>) -> Self {
        Self::with_level(outbox, HintLevel::DEFAULT)
    }

    /// Create a coordinator at a given level
    pub fn with_level(outbox: Arc<dyn Outbox>, level: HintLevel) -> Self {
        let (level, _) = watch::channel(level);
        Self { level, outbox }
    }

    /// Current level
    #[must_use]
    pub fn level(&self) -> HintLevel {
        *self.level.borrow()
    }

    /// Observe level changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<HintLevel> {
        self.level.subscribe()
    }

    /// Change the level locally
    ///
    /// The new value is readable immediately; the backend hears about it
    /// once the `hints:level_change` window closes. Setting the current
    /// level again is a no-op.
    pub fn set_level(&self, level: i64) -> HintLevel {
        let level = HintLevel::clamp(level);
        if !self.replace(level) {
            return level;
        }

        log::debug!("Hint level set to {level}");
        self.outbox
            .send(OutboundMessage::HintLevelChange(HintLevelChange {
                level: level.value(),
            }));
        level
    }

    /// Apply a level chosen by the backend, without notifying it
    pub fn restore(&self, level: i64) -> HintLevel {
        let level = HintLevel::clamp(level);
        if self.replace(level) {
            log::debug!("Hint level restored to {level}");
        }
        level
    }

    /// Subscribe to backend level updates
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> Vec<Subscription> {
        let on_restored = Arc::clone(self);
        let on_level = Arc::clone(self);
        vec![
            bus.on(InboundKind::Restored, move |message| {
                if let InboundMessage::Restored(restored) = message {
                    if let Some(level) = restored.hint_level {
                        on_restored.restore(level);
                    }
                }
            }),
            bus.on(InboundKind::HintLevel, move |message| {
                if let InboundMessage::HintLevel(update) = message {
                    on_level.restore(update.level);
                }
            }),
        ]
    }

    fn replace(&self, level: HintLevel) -> bool {
        self.level.send_if_modified(|current| {
            if *current == level {
                false
            } else {
                *current = level;
                true
            }
        })
    }
}

impl fmt::Debug for HintCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HintCoordinator")
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}
