//! # warden-store
//!
//! Durable storage for intercepted query records.
//!
//! The proxy writes a pending record for every statement it withholds, the
//! admin API moves records to `approved` or `rejected`, and the proxy's
//! approval coordinator reacts to those transitions. Two backends implement
//! the [`QueryRecordStore`] contract:
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`MemoryStore`] | Process-local, used in tests and throwaway setups |
//! | [`FileStore`] | JSON Lines files per status, reloaded on start |
//!
//! Every successful transition is also published as a [`StatusChange`] so
//! consumers can react without waiting for their next poll.

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{QueryRecordStore, StatusChange};

use std::sync::Arc;
use warden_core::{StoreBackend, StoreConfig};

/// Create a store backend based on configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn QueryRecordStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(&config.directory)?)),
    }
}
