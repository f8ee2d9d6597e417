//! Per-community stat cache.
//!
//! Each community moves through these states:
//!
//! ```text
//! Absent -> Building -> Fresh -> Stale -> BackgroundRefreshing -> Fresh
//! ```
//!
//! Readers only wait on the first build of a community. Stale data keeps
//! being served while a background rebuild runs, and at most one rebuild runs
//! per community at a time. A finished rebuild replaces the community's
//! entries in one swap and persists a snapshot without blocking readers.

mod rebuild;
mod scheduler;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

use crate::models::{CacheSnapshot, CommunityEntries, CommunityId, Season};
use crate::query::{rank_leaderboard, LeaderboardQuery, LeaderboardRow, DEFAULT_LEADERBOARD_SIZE};
use crate::source::MatchSource;
use crate::storage::{PersistentStore, StorageError};

/// Errors surfaced by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to load community roster: {0}")]
    Roster(#[from] StorageError),
}

/// Runtime settings for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age after which an entry is stale
    pub ttl: Duration,

    /// Age after which the scheduler refreshes an entry; below `ttl`
    pub refresh_ahead: Duration,

    /// How often the scheduler scans communities
    pub scan_interval: Duration,

    /// Users rebuilt concurrently
    pub batch_size: usize,

    /// Pause between batches
    pub batch_delay: Duration,

    pub leaderboard_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            refresh_ahead: Duration::from_secs(50 * 60),
            scan_interval: Duration::from_secs(10 * 60),
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

/// One generation of a community's cached entries.
#[derive(Debug, Clone)]
pub struct CommunityCache {
    pub entries: Arc<CommunityEntries>,
    pub built_at: DateTime<Utc>,
    /// Set by a forced refresh; the entry is stale until the next build
    pub invalidated: bool,
}

impl CommunityCache {
    pub fn new(entries: CommunityEntries, built_at: DateTime<Utc>) -> Self {
        Self {
            entries: Arc::new(entries),
            built_at,
            invalidated: false,
        }
    }

    /// Time since the build; zero if `built_at` lies in the future.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.built_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.invalidated || self.age(now) > ttl
    }
}

/// Freshness summary for one community.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub community_id: CommunityId,
    pub last_built_at: DateTime<Utc>,
    pub user_count: usize,
    pub is_stale: bool,
    pub refreshing: bool,
}

/// Result of a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// New entries were committed
    Completed { user_count: usize },
    /// Another rebuild for the community was already running
    AlreadyRunning,
    /// The community was cleared while rebuilding; nothing was committed
    Discarded,
    /// Every member failed, so the previous entries were kept
    KeptPrevious { roster_size: usize },
}

/// Marker for a running rebuild.
#[derive(Debug, Default)]
struct InFlight {
    discard: AtomicBool,
    finished: AtomicBool,
    done: Notify,
}

impl InFlight {
    fn is_discarded(&self) -> bool {
        self.discard.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let notified = self.done.notified();
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

type InFlightMap = Arc<Mutex<HashMap<CommunityId, Arc<InFlight>>>>;

fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<CommunityId, Arc<InFlight>>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive right to rebuild one community. Dropping it releases the
/// community and wakes readers waiting on the build.
struct RefreshGuard {
    map: InFlightMap,
    community: CommunityId,
    flight: Arc<InFlight>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        let mut map = lock(&self.map);
        if map
            .get(&self.community)
            .is_some_and(|f| Arc::ptr_eq(f, &self.flight))
        {
            map.remove(&self.community);
        }
        self.flight.finished.store(true, Ordering::SeqCst);
        self.flight.done.notify_waiters();
    }
}

/// The per-community statistics cache service.
pub struct StatCache {
    source: Arc<dyn MatchSource>,
    store: Arc<dyn PersistentStore>,
    config: CacheConfig,
    season: Season,
    communities: Arc<RwLock<HashMap<CommunityId, CommunityCache>>>,
    in_flight: InFlightMap,
}

impl StatCache {
    pub fn new(
        source: Arc<dyn MatchSource>,
        store: Arc<dyn PersistentStore>,
        config: CacheConfig,
        season: Season,
    ) -> Self {
        Self {
            source,
            store,
            config,
            season,
            communities: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Ranked leaderboard for a community.
    pub async fn leaderboard(
        self: &Arc<Self>,
        community: &CommunityId,
        query: &LeaderboardQuery,
    ) -> Result<Vec<LeaderboardRow>, CacheError> {
        let entries = self.entries(community).await?;
        Ok(rank_leaderboard(
            &entries,
            query,
            self.config.leaderboard_size,
        ))
    }

    /// Current entries for a community, building or refreshing as needed.
    ///
    /// Absent communities are built before returning. Stale communities are
    /// returned as they are and refreshed in the background. A reader that
    /// arrives while another build of an absent community is running waits
    /// for it and gets an empty map if it fails. If that build was discarded
    /// by a clear, the reader starts a build of its own.
    pub async fn entries(
        self: &Arc<Self>,
        community: &CommunityId,
    ) -> Result<Arc<CommunityEntries>, CacheError> {
        loop {
            if let Some(cached) = self.cached(community).await {
                if cached.is_stale(self.config.ttl, Utc::now()) {
                    self.spawn_refresh(community);
                }
                return Ok(cached.entries);
            }

            if let Some(guard) = self.try_begin(community) {
                info!("Building cache for community {}", community);
                self.rebuild(community, guard).await?;
                break;
            }

            let flight = lock(&self.in_flight).get(community).cloned();
            let Some(flight) = flight else {
                // Finished between the two lookups
                continue;
            };
            debug!("Waiting for in-flight build of {}", community);
            flight.wait().await;
            if !flight.is_discarded() {
                break;
            }
            debug!("Build of {} was discarded, building again", community);
        }

        Ok(self
            .cached(community)
            .await
            .map(|c| c.entries)
            .unwrap_or_default())
    }

    /// Invalidate and rebuild a community now, bypassing the TTL.
    pub async fn refresh_cache(
        &self,
        community: &CommunityId,
    ) -> Result<RefreshOutcome, CacheError> {
        if let Some(cached) = self.communities.write().await.get_mut(community) {
            cached.invalidated = true;
        }

        match self.try_begin(community) {
            Some(guard) => self.rebuild(community, guard).await,
            None => {
                debug!("Refresh of {} already running", community);
                Ok(RefreshOutcome::AlreadyRunning)
            }
        }
    }

    /// Rebuild a community now if its cached entries are stale, waiting for
    /// the result. Returns `None` when the community is fresh or absent.
    pub async fn refresh_if_stale(
        &self,
        community: &CommunityId,
    ) -> Result<Option<RefreshOutcome>, CacheError> {
        let stale = self
            .cached(community)
            .await
            .is_some_and(|c| c.is_stale(self.config.ttl, Utc::now()));
        if !stale {
            return Ok(None);
        }

        info!("Cache for {} is stale, rebuilding", community);
        self.refresh_cache(community).await.map(Some)
    }

    /// Start a background rebuild unless one is running. Returns whether one
    /// was started.
    pub fn spawn_refresh(self: &Arc<Self>, community: &CommunityId) -> bool {
        let Some(guard) = self.try_begin(community) else {
            debug!("Refresh of {} already running", community);
            return false;
        };

        let cache = Arc::clone(self);
        let community = community.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.rebuild(&community, guard).await {
                warn!("Background refresh of {} failed: {}", community, e);
            }
        });
        true
    }

    /// Drop a community from memory and storage. A running rebuild for it
    /// finishes without committing. Returns whether it was cached.
    pub async fn clear_cache(&self, community: &CommunityId) -> bool {
        if let Some(flight) = lock(&self.in_flight).get(community) {
            flight.discard.store(true, Ordering::SeqCst);
        }

        let removed = self.communities.write().await.remove(community).is_some();
        if let Err(e) = self.store.delete_snapshot(community).await {
            warn!("Failed to delete snapshot for {}: {}", community, e);
        }

        info!("Cleared cache for community {}", community);
        removed
    }

    /// Drop every community from memory and storage. Returns how many
    /// communities were cleared.
    pub async fn clear_all_caches(&self) -> usize {
        for flight in lock(&self.in_flight).values() {
            flight.discard.store(true, Ordering::SeqCst);
        }

        let mut cleared: Vec<CommunityId> = self
            .communities
            .write()
            .await
            .drain()
            .map(|(id, _)| id)
            .collect();

        match self.store.list_snapshots().await {
            Ok(metas) => cleared.extend(metas.into_iter().map(|m| m.community_id)),
            Err(e) => warn!("Failed to list snapshots: {}", e),
        }
        cleared.sort();
        cleared.dedup();

        for community in &cleared {
            if let Err(e) = self.store.delete_snapshot(community).await {
                warn!("Failed to delete snapshot for {}: {}", community, e);
            }
        }

        info!("Cleared {} community caches", cleared.len());
        cleared.len()
    }

    /// Freshness of a community, or `None` if it has never been built.
    pub async fn cache_info(&self, community: &CommunityId) -> Option<CacheInfo> {
        let cached = self.cached(community).await?;
        Some(CacheInfo {
            community_id: community.clone(),
            last_built_at: cached.built_at,
            user_count: cached.entries.len(),
            is_stale: cached.is_stale(self.config.ttl, Utc::now()),
            refreshing: self.is_refreshing(community),
        })
    }

    pub fn is_refreshing(&self, community: &CommunityId) -> bool {
        lock(&self.in_flight).contains_key(community)
    }

    /// Communities currently held in memory.
    pub async fn communities(&self) -> Vec<CommunityId> {
        let mut ids: Vec<CommunityId> = self.communities.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Load persisted snapshots, keeping their original build times.
    /// Returns how many communities were loaded.
    pub async fn hydrate(&self) -> usize {
        let metas = match self.store.list_snapshots().await {
            Ok(metas) => metas,
            Err(e) => {
                warn!("Failed to list snapshots: {}", e);
                return 0;
            }
        };

        let mut loaded = 0;
        for meta in metas {
            match self.store.load_snapshot(&meta.community_id).await {
                Ok(Some(snapshot)) => {
                    let CacheSnapshot {
                        community_id,
                        built_at,
                        entries,
                    } = snapshot;
                    self.communities
                        .write()
                        .await
                        .insert(community_id, CommunityCache::new(entries, built_at));
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to load snapshot for {}: {}", meta.community_id, e),
            }
        }

        info!("Hydrated {} community caches", loaded);
        loaded
    }

    /// Write the community's current entries to storage and wait for it.
    /// Returns false when nothing is cached.
    pub async fn save_snapshot(&self, community: &CommunityId) -> Result<bool, StorageError> {
        let Some(cached) = self.cached(community).await else {
            return Ok(false);
        };

        let snapshot = CacheSnapshot {
            community_id: community.clone(),
            built_at: cached.built_at,
            entries: (*cached.entries).clone(),
        };
        self.store.save_snapshot(&snapshot).await?;
        Ok(true)
    }

    async fn cached(&self, community: &CommunityId) -> Option<CommunityCache> {
        self.communities.read().await.get(community).cloned()
    }

    fn try_begin(&self, community: &CommunityId) -> Option<RefreshGuard> {
        let mut map = lock(&self.in_flight);
        if map.contains_key(community) {
            return None;
        }

        let flight = Arc::new(InFlight::default());
        map.insert(community.clone(), Arc::clone(&flight));
        Some(RefreshGuard {
            map: Arc::clone(&self.in_flight),
            community: community.clone(),
            flight,
        })
    }
}
