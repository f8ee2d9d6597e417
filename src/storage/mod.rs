//! Persistent store for community rosters and cache snapshots.
//!
//! The cache talks to storage only through [`PersistentStore`]. The
//! filesystem implementation ([`JsonlStore`]) keeps everything as JSON
//! Lines under a data directory:
//!
//! ```text
//! <data_dir>/communities/<community>/members.jsonl
//! <data_dir>/snapshots/<community>/meta.json
//! <data_dir>/snapshots/<community>/entries.jsonl
//! ```

mod jsonl;
mod store;

pub use jsonl::*;
pub use store::*;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CacheSnapshot, CommunityId, PlayerId, SnapshotMeta, UserRecord};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Roster and snapshot persistence consumed by the cache.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Members of a community keyed by user id. Unknown communities are empty.
    async fn community_roster(
        &self,
        community: &CommunityId,
    ) -> Result<HashMap<PlayerId, UserRecord>, StorageError>;

    /// Replace the persisted snapshot for the snapshot's community.
    async fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<(), StorageError>;

    async fn load_snapshot(
        &self,
        community: &CommunityId,
    ) -> Result<Option<CacheSnapshot>, StorageError>;

    /// Remove a persisted snapshot. Deleting a missing snapshot succeeds.
    async fn delete_snapshot(&self, community: &CommunityId) -> Result<(), StorageError>;

    /// Communities that have a persisted snapshot.
    async fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>, StorageError>;
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn communities_dir(&self) -> PathBuf {
        self.data_dir.join("communities")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn roster_path(&self, community: &CommunityId) -> Result<PathBuf, StorageError> {
        Ok(self
            .communities_dir()
            .join(path_component(community)?)
            .join("members.jsonl"))
    }

    pub fn snapshot_dir(&self, community: &CommunityId) -> Result<PathBuf, StorageError> {
        Ok(self.snapshots_dir().join(path_component(community)?))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

fn path_component(community: &CommunityId) -> Result<&str, StorageError> {
    if community.is_path_safe() {
        Ok(community.as_str())
    } else {
        Err(StorageError::InvalidPath(community.to_string()))
    }
}
