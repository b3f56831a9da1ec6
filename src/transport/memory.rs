//! In-process transport
//!
//! [`memory_pair`] returns a client-side [`MemoryTransport`] and the
//! [`MemoryServer`] that plays the backend. Every successful `connect`
//! hands the server a fresh [`ServerConnection`]; dropping that connection
//! ends the client's frame stream, which is how tests simulate an outage.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{CoachError, Result};
use crate::protocol::{Envelope, InboundMessage, PROTOCOL_VERSION, Welcome, encode_envelope};
use crate::types::identifiers::SessionId;

use super::Transport;

struct Link {
    refusing: bool,
    attempts: u32,
    accept_tx: mpsc::UnboundedSender<ServerConnection>,
}

/// Create a connected client/server pair
#[must_use]
pub fn memory_pair() -> (MemoryTransport, MemoryServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let link = Arc::new(Mutex::new(Link {
        refusing: false,
        attempts: 0,
        accept_tx,
    }));
    (
        MemoryTransport {
            link: Arc::clone(&link),
            outbound: None,
            frames: None,
        },
        MemoryServer { link, accept_rx },
    )
}

/// Client side of an in-process connection
pub struct MemoryTransport {
    link: Arc<Mutex<Link>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    frames: Option<mpsc::UnboundedReceiver<Result<String>>>,
}

impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<()> {
        let (to_client, frames) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();

        {
            let mut link = self.link.lock();
            link.attempts += 1;
            if link.refusing {
                return Err(CoachError::connection("Connection refused"));
            }
            link.accept_tx
                .send(ServerConnection {
                    to_client,
                    from_client,
                })
                .map_err(|_| CoachError::connection("Server is gone"))?;
        }

        self.outbound = Some(outbound);
        self.frames = Some(frames);
        Ok(())
    }

    async fn write(&mut self, frame: &str) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| CoachError::transport("Transport is not ready for writing"))?;
        outbound
            .send(frame.to_owned())
            .map_err(|_| CoachError::transport("Connection closed by server"))
    }

    fn read_frames(&mut self) -> mpsc::UnboundedReceiver<Result<String>> {
        self.frames.take().unwrap_or_else(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(Err(CoachError::connection(
                "Not connected - frame stream not available",
            )));
            rx
        })
    }

    fn is_ready(&self) -> bool {
        self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    async fn close(&mut self) -> Result<()> {
        self.outbound = None;
        self.frames = None;
        Ok(())
    }
}

/// Backend side of the pair
pub struct MemoryServer {
    link: Arc<Mutex<Link>>,
    accept_rx: mpsc::UnboundedReceiver<ServerConnection>,
}

impl MemoryServer {
    /// Make subsequent `connect` calls fail (or succeed again)
    pub fn refuse_connections(&self, refusing: bool) {
        self.link.lock().refusing = refusing;
    }

    /// Number of `connect` calls seen so far, refused ones included
    #[must_use]
    pub fn connection_attempts(&self) -> u32 {
        self.link.lock().attempts
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.accept_rx.recv().await
    }

    /// Take a connection that is already waiting, if any
    pub fn try_accept(&mut self) -> Option<ServerConnection> {
        self.accept_rx.try_recv().ok()
    }
}

/// One accepted connection, seen from the backend
pub struct ServerConnection {
    to_client: mpsc::UnboundedSender<Result<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerConnection {
    /// Push a typed message to the client
    ///
    /// Returns `false` if the client side is gone.
    pub fn send(&self, message: &InboundMessage) -> bool {
        match encode_envelope(message, None) {
            Ok(frame) => self.send_raw(frame),
            Err(e) => {
                log::error!("Failed to encode inbound message: {e}");
                false
            }
        }
    }

    /// Push a raw frame, valid or not
    pub fn send_raw(&self, frame: impl Into<String>) -> bool {
        self.to_client.send(Ok(frame.into())).is_ok()
    }

    /// Accept the handshake with the current protocol version
    pub fn welcome(&self, session_id: impl Into<SessionId>) -> bool {
        self.send(&InboundMessage::Welcome(Welcome {
            session_id: session_id.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_version: None,
        }))
    }

    /// Report a transport failure on this connection and drop it
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.to_client.send(Err(CoachError::transport(reason)));
    }

    /// Next raw frame written by the client
    pub async fn recv_frame(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next envelope written by the client
    ///
    /// Frames that are not envelopes end the stream.
    pub async fn recv(&mut self) -> Option<Envelope> {
        let frame = self.from_client.recv().await?;
        serde_json::from_str(&frame).ok()
    }

    /// Envelope already written by the client, if any
    pub fn try_recv(&mut self) -> Option<Envelope> {
        let frame = self.from_client.try_recv().ok()?;
        serde_json::from_str(&frame).ok()
    }

    /// Whether the client still holds this connection
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.to_client.is_closed()
    }
}
