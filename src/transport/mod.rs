//! Transport layer for talking to the coaching backend
//!
//! This module provides the transport abstraction and its implementations:
//!
//! - [`WebSocketTransport`] - the production transport over `tokio-tungstenite`
//! - [`memory`] - an in-process pair for tests and embedding

pub mod memory;
mod websocket;

use tokio::sync::mpsc;

use crate::error::Result;

/// Transport trait for the session manager
///
/// A transport carries text frames for one connection at a time. `connect`
/// may be called again after a failure or `close` to open a fresh
/// connection; the session manager owns the retry schedule.
pub trait Transport: Send + 'static {
    /// Open a connection
    ///
    /// # Errors
    /// Returns error if the connection cannot be established
    fn connect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Write one frame to the current connection
    ///
    /// # Errors
    /// Returns error if the write fails or no connection is open
    fn write(&mut self, frame: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Take the inbound frame stream of the current connection
    ///
    /// The receiver ends when the connection closes. An `Err` item reports
    /// a problem; the session manager decides whether it is fatal.
    fn read_frames(&mut self) -> mpsc::UnboundedReceiver<Result<String>>;

    /// Check if the transport is ready for writing
    fn is_ready(&self) -> bool;

    /// Close the current connection and clean up resources
    ///
    /// # Errors
    /// Returns error if cleanup fails
    fn close(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub use memory::{MemoryServer, MemoryTransport, ServerConnection, memory_pair};
pub use websocket::WebSocketTransport;
