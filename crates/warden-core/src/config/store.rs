//! Query record store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the query record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage backend type.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory holding the record files (for the file backend).
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            directory: default_directory(),
        }
    }
}

/// Storage backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Keep records in process memory only.
    Memory,
    /// Persist records as JSON Lines files.
    #[default]
    File,
}

fn default_directory() -> PathBuf {
    PathBuf::from("data/queries")
}
