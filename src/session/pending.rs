//! Mutations awaiting acknowledgment

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::protocol::{OutboundKind, OutboundMessage};
use crate::types::identifiers::OperationId;

/// Delivery progress of a pending mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryState {
    /// Accepted while not active, never written
    Queued,
    /// Written on the current connection, not yet acknowledged
    InFlight,
    /// A connection dropped before acknowledgment; stays until acknowledged
    Retrying,
}

/// A mutation held until the backend confirms it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    /// Correlation id carried in the envelope
    pub operation_id: OperationId,
    /// Message kind
    pub kind: OutboundKind,
    /// Full message, replayed verbatim
    pub message: OutboundMessage,
    /// When `send` accepted it
    pub enqueued_at: DateTime<Utc>,
    /// Delivery progress
    pub state: DeliveryState,
}

impl PendingOperation {
    /// Whether the UI should show a "retrying" notice for this operation
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.state == DeliveryState::Retrying
    }
}

/// Bounded FIFO of pending operations
#[derive(Debug)]
pub(crate) struct PendingQueue {
    operations: VecDeque<PendingOperation>,
    capacity: usize,
}

impl PendingQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            operations: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an operation, returning the oldest one if the bound was hit
    pub(crate) fn push(
        &mut self,
        operation_id: OperationId,
        message: OutboundMessage,
        in_flight: bool,
    ) -> Option<PendingOperation> {
        let evicted = if self.operations.len() >= self.capacity {
            self.operations.pop_front()
        } else {
            None
        };

        self.operations.push_back(PendingOperation {
            operation_id,
            kind: message.kind(),
            message,
            enqueued_at: Utc::now(),
            state: if in_flight {
                DeliveryState::InFlight
            } else {
                DeliveryState::Queued
            },
        });
        evicted
    }

    /// Remove a confirmed operation
    pub(crate) fn acknowledge(&mut self, operation_id: &OperationId) -> Option<PendingOperation> {
        let position = self
            .operations
            .iter()
            .position(|op| &op.operation_id == operation_id)?;
        self.operations.remove(position)
    }

    /// Connection lost: everything written but unconfirmed is now retrying
    pub(crate) fn interrupt(&mut self) -> usize {
        let mut count = 0;
        for op in &mut self.operations {
            if op.state == DeliveryState::InFlight {
                op.state = DeliveryState::Retrying;
                count += 1;
            }
        }
        count
    }

    /// Everything to write on re-activation, in enqueue order
    ///
    /// Queued operations become in flight; retrying ones keep their notice
    /// until acknowledged.
    pub(crate) fn begin_replay(&mut self) -> Vec<(OperationId, OutboundMessage)> {
        self.operations
            .iter_mut()
            .map(|op| {
                if op.state == DeliveryState::Queued {
                    op.state = DeliveryState::InFlight;
                }
                (op.operation_id.clone(), op.message.clone())
            })
            .collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<PendingOperation> {
        self.operations.iter().cloned().collect()
    }

    pub(crate) fn interrupted(&self) -> Vec<PendingOperation> {
        self.operations
            .iter()
            .filter(|op| op.is_interrupted())
            .cloned()
            .collect()
    }
}
