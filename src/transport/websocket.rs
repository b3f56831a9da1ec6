//! WebSocket transport implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{CoachError, Result};

use super::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport to the coaching backend
pub struct WebSocketTransport {
    url: String,
    sink: Option<SplitSink<WsStream, Message>>,
    frames: Option<mpsc::UnboundedReceiver<Result<String>>>,
    ready: Arc<AtomicBool>,
    reader_task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport for the given `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sink: None,
            frames: None,
            ready: Arc::new(AtomicBool::new(false)),
            reader_task: None,
        }
    }

    /// Endpoint this transport connects to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn teardown(&mut self) {
        self.ready.store(false, Ordering::SeqCst);
        self.frames = None;
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        self.teardown();
        self.sink = None;

        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| CoachError::connection(format!("Failed to connect to {}: {e}", self.url)))?;

        let (sink, mut reader) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let ready = Arc::clone(&self.ready);
        ready.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            while let Some(item) = reader.next().await {
                let frame = match item {
                    Ok(Message::Text(text)) => Ok(text.as_str().to_owned()),
                    Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).map_err(|e| {
                        CoachError::message_parse(format!("Binary frame is not UTF-8: {e}"), None)
                    }),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue, // Ping/Pong/raw frames
                    Err(e) => {
                        let _ = tx.send(Err(CoachError::transport(format!("WebSocket error: {e}"))));
                        break;
                    }
                };
                if tx.send(frame).is_err() {
                    // Receiver dropped, stop reading
                    break;
                }
            }
            ready.store(false, Ordering::SeqCst);
        });

        self.sink = Some(sink);
        self.frames = Some(rx);
        self.reader_task = Some(task);
        log::debug!("WebSocket connected to {}", self.url);
        Ok(())
    }

    async fn write(&mut self, frame: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(CoachError::transport("Transport is not ready for writing"));
        }

        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| CoachError::transport("WebSocket sink not available"))?;

        sink.send(Message::text(frame.to_owned()))
            .await
            .map_err(|e| CoachError::transport(format!("Failed to send frame: {e}")))
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
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.teardown();
        if let Some(mut sink) = self.sink.take() {
            // The peer may already be gone
            let _ = sink.close().await;
        }
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}
