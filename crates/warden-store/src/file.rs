//! File-based record storage.
//!
//! Records are persisted in three JSON Lines files inside one directory:
//! - `pending.log` - records awaiting a decision
//! - `approved.log` - approved records (audit trail)
//! - `rejected.log` - rejected records with their reasons
//!
//! Each file holds one JSON object per line so it can be inspected with
//! standard tools (jq, grep, etc.). The full table is kept in memory and
//! rebuilt from the files when the store is opened.

use crate::error::StoreError;
use crate::store::{CHANGE_CHANNEL_CAPACITY, QueryRecordStore, RecordTable, StatusChange};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;
use warden_core::{ClientInfo, QueryRecord, QueryStatus, StatusTransition};

/// Record store persisted as JSON Lines files.
pub struct FileStore {
    /// Directory containing the record files.
    directory: PathBuf,
    /// Full record table.
    table: RwLock<RecordTable>,
    changes: broadcast::Sender<StatusChange>,
}

impl FileStore {
    /// Open a store in the given directory.
    ///
    /// The directory is created if it doesn't exist, and any existing records
    /// are loaded from its files.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            directory,
            table: RwLock::new(RecordTable::default()),
            changes,
        };

        store.load_all()?;

        Ok(store)
    }

    fn path_for(&self, status: QueryStatus) -> PathBuf {
        self.directory.join(format!("{}.log", status.as_str()))
    }

    /// Rebuild the table from disk.
    ///
    /// Pending records are replayed first so that a record that was resolved
    /// but not yet compacted out of `pending.log` ends up resolved.
    fn load_all(&self) -> Result<(), StoreError> {
        let mut table = self.table.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut stale_pending = false;

        for status in QueryStatus::ALL {
            for record in Self::load_from_file(&self.path_for(status))? {
                if record.status != status {
                    tracing::warn!(
                        query_id = %record.id,
                        file = %status,
                        record_status = %record.status,
                        "Record stored in the wrong file, keeping its own status"
                    );
                }
                if status.is_terminal() && table.contains(&record.id) {
                    stale_pending = true;
                }
                table.upsert(record);
            }
        }

        if stale_pending {
            let pending = table.list_by_status(QueryStatus::Pending);
            Self::rewrite_file(&self.path_for(QueryStatus::Pending), &pending)?;
        }

        tracing::info!(
            directory = %self.directory.display(),
            records = table.len(),
            "Loaded query records"
        );
        Ok(())
    }

    /// Load records from a JSON Lines file.
    fn load_from_file(path: &Path) -> Result<Vec<QueryRecord>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<QueryRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse query record on line {} of {}: {}",
                        line_num + 1,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok(records)
    }

    /// Append a record to a file.
    fn append_to_file(path: &Path, record: &QueryRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Rewrite a file with the given records, oldest first.
    fn rewrite_file(path: &Path, records: &[QueryRecord]) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        for record in records.iter().rev() {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }

        Ok(())
    }

    /// Get the directory path.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl QueryRecordStore for FileStore {
    async fn create(
        &self,
        id: Uuid,
        query: &str,
        submitter: &str,
        client_info: ClientInfo,
    ) -> Result<QueryRecord, StoreError> {
        let record = QueryRecord::new(id, query, submitter, client_info);
        let mut table = self.table.write().map_err(|_| StoreError::LockPoisoned)?;
        if table.contains(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        Self::append_to_file(&self.path_for(QueryStatus::Pending), &record)?;
        table.insert(record.clone())?;

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
        let updated = {
            let mut table = self.table.write().map_err(|_| StoreError::LockPoisoned)?;
            let updated = table.prepare_transition(id, &transition)?;

            // Disk first, so a failed write leaves the record pending everywhere.
            Self::append_to_file(&self.path_for(updated.status), &updated)?;
            table.upsert(updated.clone());

            // The resolution is durable now; a stale pending line is dropped on the next load.
            let pending = table.list_by_status(QueryStatus::Pending);
            if let Err(e) = Self::rewrite_file(&self.path_for(QueryStatus::Pending), &pending) {
                tracing::warn!(query_id = %id, error = %e, "Failed to compact pending records");
            }
            updated
        };

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
