//! # warden-proxy
//!
//! Postgres wire protocol interception proxy for Warden.
//!
//! This crate sits between database clients and a Postgres server and:
//! - Forwards every client message to the backend byte-for-byte
//! - Withholds simple queries that match a dangerous-statement rule
//! - Records withheld statements in a [`warden_store::QueryRecordStore`]
//! - Runs approved statements with separate credentials and reports back
//!
//! ## Architecture
//!
//! ```text
//! Developer / App
//!       │
//!       │ Postgres wire protocol
//!       ▼
//! ┌──────────────────────┐
//! │  Warden Proxy        │
//! │  1. Frame messages   │  ← framer
//! │  2. Classify query   │  ← classifier
//! │  3. Forward or hold  │  ← session
//! └───┬──────────────┬───┘
//!     │ safe         │ dangerous
//!     ▼              ▼
//!  Upstream      Query store  ←── admin API approves / rejects
//!  Postgres          │
//!     ▲              ▼
//!     └──────── Coordinator + Executor ──→ Notice / Error to client
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden_core::WardenConfig;
//! use warden_proxy::WardenProxy;
//! use warden_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = WardenConfig::default();
//!     let proxy = WardenProxy::from_config(&config, Arc::new(MemoryStore::new()))?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     proxy.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod framer;
pub mod proxy;
pub mod response;
pub mod session;

pub use classifier::{Classification, ClassificationRule, RuleSet};
pub use connection::{ClientConnection, ConnectionState, Delivery};
pub use coordinator::{ApprovalCoordinator, PendingExecution, PollSummary};
pub use error::{ExecutorError, FramingError, ProxyError};
pub use executor::{ExecutionOutcome, PgStatementExecutor, StatementExecutor};
pub use framer::{MessageFramer, MessageKind, ProtocolMessage};
pub use proxy::WardenProxy;
pub use response::{encode_error, encode_notice};
pub use session::{Session, SessionContext};
