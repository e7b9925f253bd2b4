//! Client connection handles with explicit lifecycle state.
//!
//! A [`ClientConnection`] owns the write half of a client socket. Writers
//! that don't own the session (the approval coordinator) hold only a
//! [`Weak`](std::sync::Weak) reference and check the state right before
//! writing; once the connection leaves [`ConnectionState::Open`] every write
//! is silently discarded.

use crate::response::{encode_error, encode_notice};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, watch};

/// Lifecycle of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting writes.
    Open,
    /// Teardown has started; writes are discarded.
    Closing,
    /// The socket is shut down.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Result of a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The bytes were written and flushed.
    Written,
    /// The connection was no longer open.
    Discarded,
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of one client connection.
pub struct ClientConnection {
    id: u64,
    state: watch::Sender<ConnectionState>,
    writer: Mutex<BoxedWriter>,
}

impl ClientConnection {
    /// Wrap the write half of a client socket.
    pub fn new<W>(id: u64, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (state, _) = watch::channel(ConnectionState::Open);
        Self {
            id,
            state,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Session identifier, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Write bytes if the connection is still open.
    ///
    /// The state is checked both before waiting for the writer and again
    /// once it is held, so a write racing with teardown is dropped rather
    /// than sent to a socket being shut down.
    pub async fn write_raw(&self, bytes: &[u8]) -> std::io::Result<Delivery> {
        if !self.is_open() {
            return Ok(Delivery::Discarded);
        }

        let mut writer = self.writer.lock().await;
        if !self.is_open() {
            return Ok(Delivery::Discarded);
        }

        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(Delivery::Written)
    }

    /// Send a NoticeResponse.
    pub async fn send_notice(&self, message: &str) -> std::io::Result<Delivery> {
        self.write_raw(&encode_notice(message)).await
    }

    /// Send an ErrorResponse.
    pub async fn send_error(&self, message: &str) -> std::io::Result<Delivery> {
        self.write_raw(&encode_error(message)).await
    }

    /// Shut the connection down. Idempotent.
    pub async fn close(&self) {
        let started = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Open {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(session = self.id, error = %e, "Client shutdown failed");
        }
        self.state.send_replace(ConnectionState::Closed);
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
