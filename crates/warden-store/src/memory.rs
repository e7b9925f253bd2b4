//! In-memory record store.

use crate::error::StoreError;
use crate::store::{CHANGE_CHANNEL_CAPACITY, QueryRecordStore, RecordTable, StatusChange};
use async_trait::async_trait;
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;
use warden_core::{ClientInfo, QueryRecord, QueryStatus, StatusTransition};

/// Record store that lives only as long as the process.
pub struct MemoryStore {
    table: RwLock<RecordTable>,
    changes: broadcast::Sender<StatusChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            table: RwLock::new(RecordTable::default()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryRecordStore for MemoryStore {
    async fn create(
        &self,
        id: Uuid,
        query: &str,
        submitter: &str,
        client_info: ClientInfo,
    ) -> Result<QueryRecord, StoreError> {
        let record = QueryRecord::new(id, query, submitter, client_info);
        self.table
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(record.clone())?;

        tracing::debug!(query_id = %id, "Stored pending query");
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueryRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.get(&id).cloned())
    }

    async fn list_by_status(&self, status: QueryStatus) -> Result<Vec<QueryRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.list_by_status(status))
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> Result<QueryRecord, StoreError> {
        let updated = self
            .table
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .transition(id, &transition)?;

        tracing::info!(query_id = %id, status = %updated.status, "Query resolved");
        let _ = self.changes.send(StatusChange {
            id,
            status: updated.status,
        });
        Ok(updated)
    }

    async fn list_all(&self) -> Result<Vec<QueryRecord>, StoreError> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.list_all())
    }

    fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.changes.subscribe()
    }
}
