//! Outbound coalescing
//!
//! One slot per (kind, key). Every push replaces the slot's message and
//! restarts its window; the ceiling is measured from the first push of the
//! burst and is never pushed back.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::protocol::{OutboundKind, OutboundMessage};
use crate::types::options::DebouncePolicy;

struct Slot {
    message: OutboundMessage,
    first_at: Instant,
    due: Instant,
    seq: u64,
}

#[derive(Default)]
pub(crate) struct Debouncer {
    slots: HashMap<(OutboundKind, String), Slot>,
    next_seq: u64,
}

impl Debouncer {
    pub(crate) fn push(&mut self, message: OutboundMessage, policy: DebouncePolicy, now: Instant) {
        let key = (message.kind(), message.debounce_key().to_owned());
        let trailing = now + policy.window;

        match self.slots.get_mut(&key) {
            Some(slot) => {
                slot.message = message;
                slot.due = match policy.max_wait {
                    Some(max_wait) => trailing.min(slot.first_at + max_wait),
                    None => trailing,
                };
            }
            None => {
                self.next_seq += 1;
                self.slots.insert(
                    key,
                    Slot {
                        message,
                        first_at: now,
                        due: trailing,
                        seq: self.next_seq,
                    },
                );
            }
        }
    }

    /// Earliest due time across all slots
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().map(|slot| slot.due).min()
    }

    /// Remove and return every message due at `now`, oldest burst first
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<OutboundMessage> {
        let due_keys: Vec<_> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.due <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut due: Vec<Slot> = due_keys
            .iter()
            .filter_map(|key| self.slots.remove(key))
            .collect();
        due.sort_by_key(|slot| (slot.due, slot.seq));
        due.into_iter().map(|slot| slot.message).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
