//! Cached per-user statistics and their persisted snapshot form.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BundleTree, CommunityId, PlayerId, QueueFilter, Scope, StatBundle, TimeWindow};

/// A community member as recorded by the persistent store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: PlayerId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(user_id: impl Into<PlayerId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            joined_at: Utc::now(),
        }
    }
}

/// Player profile returned by the match source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub player_id: PlayerId,
    pub display_name: String,
}

/// Everything the cache knows about one user in one community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCacheEntry {
    pub user_id: PlayerId,
    pub display_name: String,
    pub current_rating: f64,
    pub weekly_rating_delta: f64,
    pub seasonal_rating_delta: f64,
    pub bundles: BundleTree,
}

impl UserCacheEntry {
    /// Look up one bundle of the tree.
    pub fn bundle(&self, window: TimeWindow, scope: Scope, queue: QueueFilter) -> Option<&StatBundle> {
        self.bundles.get(&window)?.get(&scope)?.get(&queue)
    }

    /// Matches played across every window, scope and queue.
    pub fn total_events(&self) -> u32 {
        self.bundle(TimeWindow::AllTime, Scope::Global, QueueFilter::All)
            .map(|b| b.events_played)
            .unwrap_or(0)
    }
}

/// Users of one community keyed by id.
pub type CommunityEntries = HashMap<PlayerId, UserCacheEntry>;

/// Persisted form of a community cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub community_id: CommunityId,
    pub built_at: DateTime<Utc>,
    pub entries: CommunityEntries,
}

/// Listing entry for a persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub community_id: CommunityId,
    pub built_at: DateTime<Utc>,
    #[serde(default)]
    pub user_count: usize,
}
