//! Command protocol between `SessionManager` handles and the driver task

use tokio::sync::oneshot;

use crate::error::Result;
use crate::protocol::OutboundMessage;
use crate::types::identifiers::OperationId;

/// Commands that can be sent to the session driver
pub(super) enum SessionCommand {
    /// Open the connection if it is not already open or opening
    Connect,

    /// Close the connection and stop retrying
    Disconnect {
        /// Signalled once the transport is closed
        response_tx: oneshot::Sender<()>,
    },

    /// Route an outbound message through its send policy
    Send {
        /// Message to deliver
        message: OutboundMessage,
        /// Correlation id, present for mutations
        operation_id: Option<OperationId>,
    },

    /// Close the connection and end the driver task
    Shutdown {
        /// Channel to send the shutdown confirmation back
        response_tx: oneshot::Sender<Result<()>>,
    },
}
