//! Transport session management
//!
//! [`SessionManager`] is a cheap, cloneable handle to a background driver
//! task that owns the transport. The driver runs the connection lifecycle
//! (`disconnected -> connecting -> handshaking -> active`, and
//! `reconnecting` with exponential backoff on any loss), applies the
//! per-kind send policies, replays unacknowledged mutations after an outage
//! and publishes inbound traffic on the [`MessageBus`].
//!
//! # Example
//!
//! ```no_run
//! use kodegen_coach_client::bus::MessageBus;
//! use kodegen_coach_client::protocol::InboundKind;
//! use kodegen_coach_client::session::SessionManager;
//! use kodegen_coach_client::transport::WebSocketTransport;
//! use kodegen_coach_client::CoachOptions;
//!
//! # async fn example() {
//! let options = CoachOptions::default();
//! let transport = WebSocketTransport::new(options.server_url.clone());
//! let session = SessionManager::new(transport, options, MessageBus::new());
//!
//! let _pong = session.on(InboundKind::Pong, |_| log::info!("pong"));
//! session.connect();
//! # }
//! ```

mod backoff;
mod commands;
mod debounce;
mod driver;
mod pending;
mod state;

use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::bus::{MessageBus, Subscription};
use crate::error::{CoachError, Result};
use crate::protocol::{InboundKind, InboundMessage, OutboundMessage};
use crate::transport::Transport;
use crate::types::identifiers::OperationId;
use crate::types::options::{CoachOptions, SendPolicy};

use commands::SessionCommand;
use debounce::Debouncer;
use driver::Driver;
use pending::PendingQueue;

pub use backoff::delay_for;
pub use pending::{DeliveryState, PendingOperation};
pub use state::{ConnectionState, ConnectionStatus};

/// Anything that can take outbound messages
///
/// Components send through this seam instead of holding a concrete
/// [`SessionManager`], which keeps them testable with a recording fake.
pub trait Outbox: Send + Sync {
    /// Route a message through its send policy
    ///
    /// Returns the operation id for mutations, `None` otherwise.
    fn send(&self, message: OutboundMessage) -> Option<OperationId>;
}

struct Shared {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    status_rx: watch::Receiver<ConnectionStatus>,
    pending: Arc<Mutex<PendingQueue>>,
    bus: MessageBus,
    options: CoachOptions,
}

/// Handle to the single logical backend connection
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Spawn the session driver for `transport`
    ///
    /// Must be called from within a Tokio runtime. The connection is not
    /// opened until [`connect`](Self::connect) is called.
    pub fn new<T: Transport>(transport: T, options: CoachOptions, bus: MessageBus) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) =
            watch::channel(ConnectionStatus::new(options.reconnect_notice_after));
        let pending = Arc::new(Mutex::new(PendingQueue::new(
            options.max_pending_operations,
        )));

        let driver = Driver {
            transport,
            options: options.clone(),
            bus: bus.clone(),
            status_tx,
            pending: Arc::clone(&pending),
            debouncer: Debouncer::default(),
            frames: None,
            reconnect_at: None,
            session_id: None,
            activations: 0,
        };
        tokio::spawn(driver.run(command_rx));

        Self {
            shared: Arc::new(Shared {
                command_tx,
                status_rx,
                pending,
                bus,
                options,
            }),
        }
    }

    /// Open the connection
    ///
    /// Idempotent: does nothing while connecting, handshaking or active. While
    /// reconnecting it cancels the backoff timer and retries immediately.
    pub fn connect(&self) {
        self.command(SessionCommand::Connect);
    }

    /// Close the connection and stop retrying
    ///
    /// Pending mutations are kept and replayed on the next activation.
    pub async fn disconnect(&self) {
        let (response_tx, response_rx) = oneshot::channel();
        if self.command(SessionCommand::Disconnect { response_tx }) {
            let _ = response_rx.await;
        }
    }

    /// Send a message according to its kind's policy
    ///
    /// Mutations get an [`OperationId`] and are held until acknowledged;
    /// immediate kinds are dropped while not active; debounced kinds
    /// coalesce per kind and key.
    pub fn send(&self, message: OutboundMessage) -> Option<OperationId> {
        let operation_id = match self.shared.options.policy_for(message.kind()) {
            SendPolicy::Mutation => Some(OperationId::generate()),
            SendPolicy::Immediate | SendPolicy::Debounced(_) => None,
        };
        let accepted = self.command(SessionCommand::Send {
            message,
            operation_id: operation_id.clone(),
        });
        operation_id.filter(|_| accepted)
    }

    /// Subscribe to an inbound message kind
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn on<F>(&self, kind: InboundKind, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.shared.bus.on(kind, handler)
    }

    /// Bus inbound traffic is published on
    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.shared.bus
    }

    /// Options the session runs with
    #[must_use]
    pub fn options(&self) -> &CoachOptions {
        &self.shared.options
    }

    /// Current connection status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status_rx.borrow().clone()
    }

    /// Watch the connection status
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_rx.clone()
    }

    /// Connection status as a stream, starting with the current value
    pub fn status_stream(&self) -> impl Stream<Item = ConnectionStatus> + Send + 'static {
        let mut status_rx = self.watch_status();
        async_stream::stream! {
            let current = status_rx.borrow_and_update().clone();
            yield current;
            while status_rx.changed().await.is_ok() {
                let next = status_rx.borrow_and_update().clone();
                yield next;
            }
        }
    }

    /// Wait until the connection reaches `state`
    ///
    /// # Errors
    /// Returns error if the driver task has stopped
    pub async fn wait_for_state(&self, state: ConnectionState) -> Result<ConnectionStatus> {
        let mut status_rx = self.watch_status();
        let status = status_rx
            .wait_for(|status| status.state == state)
            .await
            .map_err(|_| CoachError::channel_closed("Session driver stopped"))?;
        Ok(status.clone())
    }

    /// All mutations awaiting acknowledgment, in enqueue order
    #[must_use]
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.shared.pending.lock().snapshot()
    }

    /// Mutations whose delivery an outage interrupted
    #[must_use]
    pub fn interrupted_operations(&self) -> Vec<PendingOperation> {
        self.shared.pending.lock().interrupted()
    }

    /// Close the connection and stop the driver task
    ///
    /// # Errors
    /// Returns error if the driver has already stopped
    pub async fn shutdown(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        if !self.command(SessionCommand::Shutdown { response_tx }) {
            return Err(CoachError::channel_closed("Session driver already stopped"));
        }
        response_rx
            .await
            .map_err(|_| CoachError::channel_closed("Session driver dropped shutdown reply"))?
    }

    fn command(&self, command: SessionCommand) -> bool {
        if self.shared.command_tx.send(command).is_err() {
            log::warn!("Session driver is not running");
            return false;
        }
        true
    }
}

impl Outbox for SessionManager {
    fn send(&self, message: OutboundMessage) -> Option<OperationId> {
        Self::send(self, message)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &*self.shared.status_rx.borrow())
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}
