//! The query record store contract and the index shared by its backends.

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;
use uuid::Uuid;
use warden_core::{ClientInfo, QueryRecord, QueryStatus, StatusTransition};

/// Capacity of the status change broadcast channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Notification published whenever a record changes status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// The record that changed.
    pub id: Uuid,
    /// Its new status.
    pub status: QueryStatus,
}

/// Durable keyed storage for query records.
///
/// Implementations must serialize status transitions so that at most one
/// approval or rejection succeeds for a given record.
#[async_trait]
pub trait QueryRecordStore: Send + Sync {
    /// Create a new pending record.
    async fn create(
        &self,
        id: Uuid,
        query: &str,
        submitter: &str,
        client_info: ClientInfo,
    ) -> Result<QueryRecord, StoreError>;

    /// Get a record by ID.
    async fn get(&self, id: Uuid) -> Result<Option<QueryRecord>, StoreError>;

    /// List records with the given status, most recently added first.
    async fn list_by_status(&self, status: QueryStatus) -> Result<Vec<QueryRecord>, StoreError>;

    /// Move a pending record to a terminal status.
    async fn transition(
        &self,
        id: Uuid,
        transition: StatusTransition,
    ) -> Result<QueryRecord, StoreError>;

    /// List every record, newest first by creation time.
    async fn list_all(&self) -> Result<Vec<QueryRecord>, StoreError>;

    /// Subscribe to status change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StatusChange>;

    /// Approve a pending record.
    async fn approve(&self, id: Uuid) -> Result<QueryRecord, StoreError> {
        self.transition(id, StatusTransition::approve()).await
    }

    /// Reject a pending record with a reason.
    async fn reject(&self, id: Uuid, reason: &str) -> Result<QueryRecord, StoreError> {
        self.transition(id, StatusTransition::reject(reason)).await
    }
}

/// In-memory record index with per-status ordered lists.
///
/// Both backends keep one of these behind a lock; the file backend
/// additionally mirrors every mutation to disk.
#[derive(Debug, Default)]
pub(crate) struct RecordTable {
    records: HashMap<Uuid, QueryRecord>,
    by_status: HashMap<QueryStatus, VecDeque<Uuid>>,
}

impl RecordTable {
    pub(crate) fn insert(&mut self, record: QueryRecord) -> Result<(), StoreError> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        self.by_status
            .entry(record.status)
            .or_default()
            .push_front(record.id);
        self.records.insert(record.id, record);
        Ok(())
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<&QueryRecord> {
        self.records.get(id)
    }

    pub(crate) fn list_by_status(&self, status: QueryStatus) -> Vec<QueryRecord> {
        self.by_status
            .get(&status)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.records.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn list_all(&self) -> Vec<QueryRecord> {
        let mut all: Vec<_> = self.records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Apply a transition, enforcing that only pending records move.
    pub(crate) fn transition(
        &mut self,
        id: Uuid,
        transition: &StatusTransition,
    ) -> Result<QueryRecord, StoreError> {
        let updated = self.prepare_transition(id, transition)?;
        self.upsert(updated.clone());
        Ok(updated)
    }

    /// Compute the record a transition would produce without applying it.
    pub(crate) fn prepare_transition(
        &self,
        id: Uuid,
        transition: &StatusTransition,
    ) -> Result<QueryRecord, StoreError> {
        if !transition.status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                id,
                status: transition.status,
            });
        }

        let record = self.records.get(&id).ok_or(StoreError::NotFound(id))?;
        if !record.is_pending() {
            return Err(StoreError::AlreadyResolved {
                id,
                status: record.status,
            });
        }

        let mut updated = record.clone();
        updated.apply(transition);
        Ok(updated)
    }

    pub(crate) fn contains(&self, id: &Uuid) -> bool {
        self.records.contains_key(id)
    }

    /// Replace a record, moving it to the front of its status list.
    pub(crate) fn upsert(&mut self, record: QueryRecord) {
        if let Some(previous) = self.records.get(&record.id)
            && let Some(ids) = self.by_status.get_mut(&previous.status)
        {
            ids.retain(|existing| *existing != record.id);
        }
        self.by_status
            .entry(record.status)
            .or_default()
            .push_front(record.id);
        self.records.insert(record.id, record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
