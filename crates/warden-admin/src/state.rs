//! Admin application state.

use std::sync::Arc;
use warden_store::QueryRecordStore;

/// Shared application state for the admin API.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn QueryRecordStore>,
}

impl AppState {
    /// Create a new application state over a record store.
    pub fn new(store: Arc<dyn QueryRecordStore>) -> Self {
        Self { store }
    }

    /// Get the record store.
    pub fn store(&self) -> &dyn QueryRecordStore {
        self.store.as_ref()
    }
}
