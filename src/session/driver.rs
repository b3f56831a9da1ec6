//! Session driver task
//!
//! The driver owns the transport and is the only writer of the connection
//! status. It multiplexes handle commands, inbound frames, the reconnect
//! timer and the debounce deadline in a single `select!` loop, so inbound
//! dispatch happens strictly in arrival order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::backoff::delay_for;
use super::commands::SessionCommand;
use super::debounce::Debouncer;
use super::pending::PendingQueue;
use super::state::{ConnectionState, ConnectionStatus};
use crate::bus::MessageBus;
use crate::error::Result;
use crate::protocol::{
    InboundMessage, OutboundMessage, RestoreRequest, Welcome, check_welcome, decode_frame,
    encode_message, hello,
};
use crate::transport::Transport;
use crate::types::identifiers::{OperationId, SessionId};
use crate::types::options::{CoachOptions, SendPolicy};

type FrameStream = mpsc::UnboundedReceiver<Result<String>>;

pub(super) struct Driver<T: Transport> {
    pub(super) transport: T,
    pub(super) options: CoachOptions,
    pub(super) bus: MessageBus,
    pub(super) status_tx: watch::Sender<ConnectionStatus>,
    pub(super) pending: Arc<Mutex<PendingQueue>>,
    pub(super) debouncer: Debouncer,
    pub(super) frames: Option<FrameStream>,
    pub(super) reconnect_at: Option<Instant>,
    pub(super) session_id: Option<SessionId>,
    pub(super) activations: u64,
}

impl<T: Transport> Driver<T> {
    pub(super) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<SessionCommand>) {
        loop {
            let flush_at = if self.state().is_active() {
                self.debouncer.next_deadline()
            } else {
                None
            };

            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SessionCommand::Connect) => self.connect().await,
                    Some(SessionCommand::Disconnect { response_tx }) => {
                        self.disconnect().await;
                        let _ = response_tx.send(());
                    }
                    Some(SessionCommand::Send { message, operation_id }) => {
                        self.send(message, operation_id).await;
                    }
                    Some(SessionCommand::Shutdown { response_tx }) => {
                        let result = self.shutdown().await;
                        let _ = response_tx.send(result);
                        break;
                    }
                    None => {
                        // Every handle is gone
                        let _ = self.shutdown().await;
                        break;
                    }
                },
                frame = next_frame(&mut self.frames) => match frame {
                    Some(Ok(text)) => self.handle_frame(&text).await,
                    Some(Err(e)) if !e.is_connection_fatal() => {
                        log::warn!("Dropping unreadable frame: {e}");
                    }
                    Some(Err(e)) => self.connection_lost(e.to_string()).await,
                    None => self.connection_lost("Connection closed".to_string()).await,
                },
                () = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.open().await;
                }
                () = sleep_until(flush_at) => self.flush_due().await,
            }
        }
        log::debug!("Session driver stopped");
    }

    fn state(&self) -> ConnectionState {
        self.status_tx.borrow().state
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.status_tx.borrow().state;
        if previous != state {
            log::info!("Connection state: {previous} -> {state}");
        }
        self.status_tx.send_modify(|status| status.state = state);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    async fn connect(&mut self) {
        match self.state() {
            ConnectionState::Connecting | ConnectionState::Handshaking | ConnectionState::Active => {
                log::debug!("connect() ignored, already {}", self.state());
            }
            ConnectionState::Reconnecting => {
                // Explicit connect cancels the pending retry and tries now
                self.reconnect_at = None;
                self.open().await;
            }
            ConnectionState::Disconnected => self.open().await,
        }
    }

    async fn open(&mut self) {
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.transport.connect().await {
            self.schedule_reconnect(e.to_string());
            return;
        }

        self.frames = Some(self.transport.read_frames());
        self.set_state(ConnectionState::Handshaking);

        let opener = hello(&self.options);
        if let Err(e) = self.write(&opener, None).await {
            self.connection_lost(e.to_string()).await;
        }
    }

    async fn activate(&mut self, welcome: Welcome) {
        let reactivation = self.activations > 0;
        self.activations += 1;
        let previous_session = self.session_id.replace(welcome.session_id.clone());

        self.status_tx.send_modify(|status| {
            status.reconnect_attempt = 0;
            status.last_error = None;
            status.session_id = Some(welcome.session_id.clone());
        });
        self.set_state(ConnectionState::Active);

        if reactivation && self.options.restore_on_reconnect {
            let restore = OutboundMessage::Restore(RestoreRequest {
                session_id: previous_session,
            });
            if let Err(e) = self.write(&restore, None).await {
                self.connection_lost(e.to_string()).await;
                return;
            }
        }

        let replay = self.pending.lock().begin_replay();
        if !replay.is_empty() {
            log::info!("Replaying {} pending operation(s)", replay.len());
        }
        for (operation_id, message) in replay {
            if let Err(e) = self.write(&message, Some(&operation_id)).await {
                self.connection_lost(e.to_string()).await;
                return;
            }
        }

        self.flush_due().await;
    }

    async fn connection_lost(&mut self, reason: String) {
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Reconnecting
        ) {
            return;
        }

        self.frames = None;
        if let Err(e) = self.transport.close().await {
            log::debug!("Error closing transport: {e}");
        }

        let interrupted = self.pending.lock().interrupt();
        if interrupted > 0 {
            log::warn!("{interrupted} operation(s) interrupted, will retry on reconnect");
        }

        self.schedule_reconnect(reason);
    }

    fn schedule_reconnect(&mut self, reason: String) {
        let attempt = self.status_tx.borrow().reconnect_attempt.saturating_add(1);
        let delay = delay_for(self.options.backoff, attempt);
        self.reconnect_at = Some(Instant::now() + delay);

        log::warn!("Connection failed ({reason}); retry {attempt} in {delay:?}");
        self.status_tx.send_modify(|status| {
            status.reconnect_attempt = attempt;
            status.last_error = Some(reason);
        });
        self.set_state(ConnectionState::Reconnecting);
    }

    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.frames = None;
        if let Err(e) = self.transport.close().await {
            log::debug!("Error closing transport: {e}");
        }

        let discarded = self.debouncer.len();
        if discarded > 0 {
            log::debug!("Discarding {discarded} coalesced message(s)");
        }
        self.debouncer.clear();
        self.pending.lock().interrupt();
        self.set_state(ConnectionState::Disconnected);
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.disconnect().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    async fn send(&mut self, message: OutboundMessage, operation_id: Option<OperationId>) {
        let kind = message.kind();
        let active = self.state().is_active();

        match self.options.policy_for(kind) {
            SendPolicy::Mutation => {
                let operation_id = operation_id.unwrap_or_else(OperationId::generate);
                let evicted =
                    self.pending
                        .lock()
                        .push(operation_id.clone(), message.clone(), active);
                if let Some(evicted) = evicted {
                    log::warn!(
                        "Pending queue full, dropped {} ({})",
                        evicted.operation_id,
                        evicted.kind
                    );
                }
                if active {
                    if let Err(e) = self.write(&message, Some(&operation_id)).await {
                        self.connection_lost(e.to_string()).await;
                    }
                }
            }
            SendPolicy::Debounced(policy) => {
                self.debouncer.push(message, policy, Instant::now());
            }
            SendPolicy::Immediate => {
                if !active {
                    log::debug!("Dropping {kind} while {}", self.state());
                    return;
                }
                if let Err(e) = self.write(&message, None).await {
                    self.connection_lost(e.to_string()).await;
                }
            }
        }
    }

    async fn flush_due(&mut self) {
        if !self.state().is_active() {
            return;
        }
        for message in self.debouncer.take_due(Instant::now()) {
            if let Err(e) = self.write(&message, None).await {
                self.connection_lost(e.to_string()).await;
                return;
            }
        }
    }

    async fn write(
        &mut self,
        message: &OutboundMessage,
        operation_id: Option<&OperationId>,
    ) -> Result<()> {
        let frame = encode_message(message, operation_id)?;
        log::trace!("-> {}", message.kind());
        self.transport.write(&frame).await
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    async fn handle_frame(&mut self, frame: &str) {
        let received = match decode_frame(frame) {
            Ok(received) => received,
            Err(e) => {
                log::warn!("Dropping frame: {e}");
                return;
            }
        };
        let message = received.message;
        log::trace!("<- {}", message.kind());

        match &message {
            InboundMessage::Welcome(welcome) => {
                if self.state() != ConnectionState::Handshaking {
                    log::debug!("Ignoring welcome while {}", self.state());
                    return;
                }
                if let Err(e) = check_welcome(welcome) {
                    log::error!("Handshake rejected: {e}");
                    self.connection_lost(e.to_string()).await;
                    return;
                }
                self.activate(welcome.clone()).await;
            }
            InboundMessage::Ack(ack) => {
                if self.pending.lock().acknowledge(&ack.operation_id).is_none() {
                    log::debug!("Ack for unknown operation {}", ack.operation_id);
                }
            }
            InboundMessage::Error(error) => {
                log::warn!("Server error {}: {}", error.code, error.message);
                if let Some(operation_id) = &error.correlation_id {
                    self.pending.lock().acknowledge(operation_id);
                }
            }
            _ => {}
        }

        self.bus.publish(&message);
    }
}

async fn next_frame(frames: &mut Option<FrameStream>) -> Option<Result<String>> {
    match frames {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
