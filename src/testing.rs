//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::models::{
    CacheSnapshot, CommunityId, MatchMap, PlayerId, Profile, RatingWindow, SnapshotMeta,
    UserRecord,
};
use crate::source::{MatchSource, SourceError};
use crate::storage::{PersistentStore, StorageError};

struct FakePlayer {
    profile: Profile,
    matches: MatchMap,
    rating: f64,
    weekly: f64,
    seasonal: f64,
}

/// Match source serving canned players, with call counters and an optional
/// gate that holds every profile lookup until opened. Profile lookups yield
/// once so concurrent lookups overlap and show up in the peak counter.
#[derive(Default)]
pub struct FakeSource {
    players: Mutex<HashMap<PlayerId, FakePlayer>>,
    failing: Mutex<HashSet<PlayerId>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    profile_calls: AtomicUsize,
    match_calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&self, id: &str, name: &str, matches: MatchMap) {
        self.players.lock().unwrap().insert(
            id.into(),
            FakePlayer {
                profile: Profile {
                    player_id: id.into(),
                    display_name: name.to_string(),
                },
                matches,
                rating: 1500.0,
                weekly: 0.0,
                seasonal: 0.0,
            },
        );
    }

    pub fn set_rating(&self, id: &str, rating: f64) {
        if let Some(p) = self.players.lock().unwrap().get_mut(&PlayerId::from(id)) {
            p.rating = rating;
        }
    }

    pub fn set_deltas(&self, id: &str, weekly: f64, seasonal: f64) {
        if let Some(p) = self.players.lock().unwrap().get_mut(&PlayerId::from(id)) {
            p.weekly = weekly;
            p.seasonal = seasonal;
        }
    }

    /// Every call for this player fails with a 503.
    pub fn fail_player(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.into());
    }

    /// Hold profile lookups until [`Self::open_gate`].
    pub fn close_gate(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }

    /// Most profile lookups ever in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn check(&self, player: &PlayerId) -> Result<(), SourceError> {
        if self.failing.lock().unwrap().contains(player) {
            return Err(SourceError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn with_player<T>(&self, player: &PlayerId, f: impl FnOnce(&FakePlayer) -> T) -> Option<T> {
        self.players.lock().unwrap().get(player).map(f)
    }
}

#[async_trait]
impl MatchSource for FakeSource {
    async fn profile(&self, player: &PlayerId) -> Result<Option<Profile>, SourceError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.check(player)?;
        Ok(self.with_player(player, |p| p.profile.clone()))
    }

    async fn all_matches(
        &self,
        player: &PlayerId,
        _community: &CommunityId,
    ) -> Result<MatchMap, SourceError> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        self.check(player)?;
        Ok(self
            .with_player(player, |p| p.matches.clone())
            .unwrap_or_default())
    }

    async fn current_rating(&self, player: &PlayerId) -> Result<f64, SourceError> {
        self.check(player)?;
        Ok(self.with_player(player, |p| p.rating).unwrap_or(0.0))
    }

    async fn rating_delta(
        &self,
        player: &PlayerId,
        window: RatingWindow,
    ) -> Result<f64, SourceError> {
        self.check(player)?;
        Ok(self
            .with_player(player, |p| match window {
                RatingWindow::Weekly => p.weekly,
                RatingWindow::Seasonal => p.seasonal,
            })
            .unwrap_or(0.0))
    }
}

/// Persistent store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    rosters: Mutex<HashMap<CommunityId, HashMap<PlayerId, UserRecord>>>,
    snapshots: Mutex<HashMap<CommunityId, CacheSnapshot>>,
    fail_rosters: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, community: &CommunityId, member: UserRecord) {
        self.rosters
            .lock()
            .unwrap()
            .entry(community.clone())
            .or_default()
            .insert(member.user_id.clone(), member);
    }

    pub fn fail_rosters(&self, fail: bool) {
        self.fail_rosters.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, community: &CommunityId) -> Option<CacheSnapshot> {
        self.snapshots.lock().unwrap().get(community).cloned()
    }

    pub fn save_direct(&self, snapshot: CacheSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.community_id.clone(), snapshot);
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn community_roster(
        &self,
        community: &CommunityId,
    ) -> Result<HashMap<PlayerId, UserRecord>, StorageError> {
        if self.fail_rosters.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "roster unavailable",
            )));
        }
        Ok(self
            .rosters
            .lock()
            .unwrap()
            .get(community)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<(), StorageError> {
        self.save_direct(snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(
        &self,
        community: &CommunityId,
    ) -> Result<Option<CacheSnapshot>, StorageError> {
        Ok(self.snapshot(community))
    }

    async fn delete_snapshot(&self, community: &CommunityId) -> Result<(), StorageError> {
        self.snapshots.lock().unwrap().remove(community);
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>, StorageError> {
        let mut metas: Vec<SnapshotMeta> = self
            .snapshots
            .lock()
            .unwrap()
            .values()
            .map(|s| SnapshotMeta {
                community_id: s.community_id.clone(),
                built_at: s.built_at,
                user_count: s.entries.len(),
            })
            .collect();
        metas.sort_by(|a, b| a.community_id.cmp(&b.community_id));
        Ok(metas)
    }
}
