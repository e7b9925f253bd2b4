//! Per-connection forwarding and interception.
//!
//! Every accepted client gets a backend connection of its own, opened before
//! any client bytes are read. Client bytes are framed and inspected; backend
//! bytes are copied to the client untouched. When either direction ends or
//! fails, both sockets are torn down.

use crate::classifier::RuleSet;
use crate::connection::{ClientConnection, Delivery};
use crate::coordinator::ApprovalCoordinator;
use crate::error::ProxyError;
use crate::framer::{MessageFramer, ProtocolMessage};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use warden_core::ClientInfo;

/// Error text sent when a dangerous statement could not be recorded.
pub const QUEUE_FAILURE_MESSAGE: &str = "Failed to queue query for approval";

/// Notice text sent when a dangerous statement is withheld.
pub fn queued_message(query_id: &uuid::Uuid) -> String {
    format!(
        "Query queued for approval. Query ID: {}. Please wait for admin approval.",
        query_id
    )
}

/// Dependencies shared by every session of one proxy.
pub struct SessionContext {
    pub coordinator: Arc<ApprovalCoordinator>,
    pub rules: RuleSet,
    /// Backend `host:port`.
    pub upstream_address: String,
    pub max_message_size: usize,
    pub read_buffer_size: usize,
}

/// One proxied client connection.
pub struct Session {
    id: u64,
    peer: SocketAddr,
    context: Arc<SessionContext>,
}

impl Session {
    pub fn new(id: u64, peer: SocketAddr, context: Arc<SessionContext>) -> Self {
        Self { id, peer, context }
    }

    /// Pair the client with a backend connection and proxy until either closes.
    pub async fn run(self, socket: TcpStream) -> Result<(), ProxyError> {
        let address = &self.context.upstream_address;
        let backend = TcpStream::connect(address).await.map_err(|e| {
            ProxyError::UpstreamConnectionFailed {
                address: address.clone(),
                source: e,
            }
        })?;

        tracing::debug!(session = self.id, peer = %self.peer, upstream = %address, "Session started");

        let (client_read, client_write) = socket.into_split();
        let (backend_read, backend_write) = backend.into_split();
        let client = Arc::new(ClientConnection::new(self.id, client_write));

        let result = tokio::select! {
            r = self.client_to_backend(client_read, backend_write, &client) => r,
            r = self.backend_to_client(backend_read, &client) => r,
        };

        client.close().await;
        tracing::debug!(session = self.id, peer = %self.peer, "Session ended");
        result
    }

    /// Frame client input, withholding dangerous statements.
    async fn client_to_backend(
        &self,
        mut reader: OwnedReadHalf,
        mut backend: OwnedWriteHalf,
        client: &Arc<ClientConnection>,
    ) -> Result<(), ProxyError> {
        let mut framer = MessageFramer::new(self.context.max_message_size);
        let mut buf = BytesMut::with_capacity(self.context.read_buffer_size);

        loop {
            buf.reserve(self.context.read_buffer_size);
            if reader.read_buf(&mut buf).await? == 0 {
                return Ok(());
            }

            let messages = match framer.feed(&mut buf) {
                Ok(messages) => messages,
                Err(e) => {
                    // Fail closed: nothing from this read reaches the backend.
                    tracing::warn!(
                        session = self.id,
                        peer = %self.peer,
                        error = %e,
                        discarded = buf.len(),
                        "Malformed client input, discarding buffer"
                    );
                    buf.clear();
                    continue;
                }
            };

            for message in messages {
                if self.is_dangerous(&message) {
                    let query = message.query_text().unwrap_or_default();
                    if self.intercept(query, client).await? == Delivery::Discarded {
                        return Ok(());
                    }
                } else {
                    backend.write_all(&message.raw).await?;
                }
            }
        }
    }

    /// Copy backend output to the client verbatim.
    async fn backend_to_client(
        &self,
        mut reader: OwnedReadHalf,
        client: &ClientConnection,
    ) -> Result<(), ProxyError> {
        let mut buf = vec![0u8; self.context.read_buffer_size];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            if client.write_raw(&buf[..n]).await? == Delivery::Discarded {
                return Ok(());
            }
        }
    }

    fn is_dangerous(&self, message: &ProtocolMessage) -> bool {
        let Some(query) = message.query_text() else {
            return false;
        };
        match self.context.rules.matching_rule(query) {
            Some(rule) => {
                tracing::warn!(session = self.id, peer = %self.peer, rule = %rule.name, "Intercepted dangerous query");
                true
            }
            None => false,
        }
    }

    /// Queue a dangerous statement and tell the client what happened.
    async fn intercept(
        &self,
        query: &str,
        client: &Arc<ClientConnection>,
    ) -> Result<Delivery, ProxyError> {
        let client_info = ClientInfo::from_socket_addr(self.peer);
        let delivery = match self.context.coordinator.submit(query, client, client_info).await {
            Ok(query_id) => client.send_notice(&queued_message(&query_id)).await?,
            Err(e) => {
                tracing::error!(session = self.id, error = %e, "Failed to queue query");
                client.send_error(QUEUE_FAILURE_MESSAGE).await?
            }
        };
        Ok(delivery)
    }
}
