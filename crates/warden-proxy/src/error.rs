//! Error types for the proxy crate.

use thiserror::Error;

/// Errors that can occur in the Postgres proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Failed to bind to the listen address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },

    /// Failed to accept a connection.
    #[error("failed to accept connection: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Failed to open the paired backend connection.
    #[error("failed to connect to upstream {address}: {source}")]
    UpstreamConnectionFailed {
        address: String,
        source: std::io::Error,
    },

    /// Socket error on either side of a connection pair.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Malformed client input that cannot be split into protocol messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// A length field smaller than the protocol minimum.
    #[error("invalid message length {length} (minimum {minimum})")]
    InvalidLength { length: i32, minimum: i32 },

    /// A length field larger than the configured cap.
    #[error("message of {length} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge { length: usize, limit: usize },

    /// A simple query payload without its trailing null byte.
    #[error("query message is missing its null terminator")]
    MissingTerminator,

    /// A simple query payload that is not valid UTF-8.
    #[error("query text is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors from running an approved statement.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Could not open the execution connection.
    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    /// Opening the execution connection took too long.
    #[error("timed out connecting after {0} seconds")]
    ConnectTimeout(u64),

    /// The statement outlived its timeout and the connection was abandoned.
    #[error("statement timed out after {0} seconds")]
    StatementTimeout(u64),

    /// The backend rejected the statement.
    #[error("{0}")]
    Statement(String),
}
