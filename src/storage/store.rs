//! Filesystem-backed [`PersistentStore`].

use std::collections::HashMap;
use std::fs;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{read_json, write_json, JsonlReader, JsonlWriter, PersistentStore, StorageConfig, StorageError};
use crate::models::{
    CacheSnapshot, CommunityId, PlayerId, SnapshotMeta, UserCacheEntry, UserRecord,
};

const META_FILE: &str = "meta.json";
const ENTRIES_FILE: &str = "entries.jsonl";

/// Rosters and snapshots stored as JSON Lines under the data directory.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    config: StorageConfig,
}

impl JsonlStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Add or update a community member. Later lines win on read.
    pub fn add_member(&self, community: &CommunityId, member: &UserRecord) -> Result<(), StorageError> {
        let path = self.config.roster_path(community)?;
        JsonlWriter::new(path).append(member)?;
        info!("Added {} to community {}", member.user_id, community);
        Ok(())
    }

    /// Community ids that have a roster file.
    pub fn list_communities(&self) -> Result<Vec<CommunityId>, StorageError> {
        let dir = self.config.communities_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut communities = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    communities.push(CommunityId::from(name));
                }
            }
        }

        communities.sort();
        Ok(communities)
    }
}

#[async_trait]
impl PersistentStore for JsonlStore {
    async fn community_roster(
        &self,
        community: &CommunityId,
    ) -> Result<HashMap<PlayerId, UserRecord>, StorageError> {
        let path = self.config.roster_path(community)?;
        let members: Vec<UserRecord> = JsonlReader::new(path).read_all()?;
        Ok(members
            .into_iter()
            .map(|m| (m.user_id.clone(), m))
            .collect())
    }

    async fn save_snapshot(&self, snapshot: &CacheSnapshot) -> Result<(), StorageError> {
        let dir = self.config.snapshot_dir(&snapshot.community_id)?;

        // Entries first: a snapshot only exists once its meta file does
        let writer: JsonlWriter<UserCacheEntry> = JsonlWriter::new(dir.join(ENTRIES_FILE));
        let count = writer.write_all(snapshot.entries.values())?;

        let meta = SnapshotMeta {
            community_id: snapshot.community_id.clone(),
            built_at: snapshot.built_at,
            user_count: count,
        };
        write_json(&dir.join(META_FILE), &meta)?;

        debug!(
            "Saved snapshot for {} ({} users)",
            snapshot.community_id, count
        );
        Ok(())
    }

    async fn load_snapshot(
        &self,
        community: &CommunityId,
    ) -> Result<Option<CacheSnapshot>, StorageError> {
        let dir = self.config.snapshot_dir(community)?;
        let Some(meta) = read_json::<SnapshotMeta>(&dir.join(META_FILE))? else {
            return Ok(None);
        };

        let entries: Vec<UserCacheEntry> = JsonlReader::new(dir.join(ENTRIES_FILE)).read_all()?;
        Ok(Some(CacheSnapshot {
            community_id: meta.community_id,
            built_at: meta.built_at,
            entries: entries
                .into_iter()
                .map(|e| (e.user_id.clone(), e))
                .collect(),
        }))
    }

    async fn delete_snapshot(&self, community: &CommunityId) -> Result<(), StorageError> {
        let dir = self.config.snapshot_dir(community)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            debug!("Deleted snapshot for {}", community);
        }
        Ok(())
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotMeta>, StorageError> {
        let dir = self.config.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut metas = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match read_json::<SnapshotMeta>(&entry.path().join(META_FILE)) {
                Ok(Some(meta)) => metas.push(meta),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable snapshot {:?}: {}", entry.path(), e),
            }
        }

        metas.sort_by(|a, b| a.community_id.cmp(&b.community_id));
        Ok(metas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BundleTree, QueueFilter, Scope, StatBundle, TimeWindow};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn store(temp_dir: &TempDir) -> JsonlStore {
        JsonlStore::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    fn entry(id: &str, rating: f64) -> UserCacheEntry {
        let mut bundles = BundleTree::new();
        for window in TimeWindow::ALL {
            let by_scope = Scope::ALL
                .into_iter()
                .map(|scope| {
                    let by_queue = QueueFilter::ALL
                        .into_iter()
                        .map(|queue| {
                            (
                                queue,
                                StatBundle {
                                    win_rate: 0.625,
                                    average_score: 41.5,
                                    best_score: 77.0,
                                    events_played: 8,
                                    average_placement: 2.25,
                                    longest_win_streak: 3,
                                },
                            )
                        })
                        .collect::<BTreeMap<_, _>>();
                    (scope, by_queue)
                })
                .collect::<BTreeMap<_, _>>();
            bundles.insert(window, by_scope);
        }

        UserCacheEntry {
            user_id: id.into(),
            display_name: format!("Player {}", id),
            current_rating: rating,
            weekly_rating_delta: 14.5,
            seasonal_rating_delta: -3.25,
            bundles,
        }
    }

    fn snapshot(community: &str) -> CacheSnapshot {
        let entries = [entry("p1", 1510.0), entry("p2", 1388.5)]
            .into_iter()
            .map(|e| (e.user_id.clone(), e))
            .collect();
        CacheSnapshot {
            community_id: community.into(),
            built_at: Utc.with_ymd_and_hms(2025, 5, 4, 10, 30, 0).unwrap(),
            entries,
        }
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let original = snapshot("guild");

        store.save_snapshot(&original).await.unwrap();
        let loaded = store.load_snapshot(&"guild".into()).await.unwrap();

        assert_eq!(loaded, Some(original));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_keeps_computed_averages_exact() {
        use crate::calculate::fixtures::{at, line, solo_match};
        use crate::calculate::{build_bundles, match_map};
        use crate::models::{CommunityEntries, Season};

        let matches = match_map([
            solo_match("m1", 0, vec![line("p1", 10.1, -7.0, 1500.0), line("p2", 20.0, 7.0, 1500.0)]),
            solo_match("m2", 1, vec![line("p1", 33.7, 4.0, 1493.0), line("p2", 12.0, -4.0, 1507.0)]),
            solo_match(
                "m3",
                2,
                vec![
                    line("p1", 60.43, -3.0, 1497.0),
                    line("p2", 99.9, 3.0, 1503.0),
                    line("p3", 1.0, 0.0, 1400.0),
                ],
            ),
        ]);

        let community = CommunityId::from("guild");
        let mut entries = CommunityEntries::new();
        for (id, rating) in [("p1", 1494.0 + 1.0 / 3.0), ("p2", 1506.0 + 2.0 / 3.0)] {
            let player = PlayerId::from(id);
            let bundles = build_bundles(&matches, &player, &community, &Season::default(), at(10));
            entries.insert(
                player.clone(),
                UserCacheEntry {
                    user_id: player,
                    display_name: id.to_uppercase(),
                    current_rating: rating,
                    weekly_rating_delta: 2.0 / 3.0,
                    seasonal_rating_delta: -1.0 / 3.0,
                    bundles,
                },
            );
        }

        let all = &entries[&PlayerId::from("p1")].bundles[&TimeWindow::AllTime][&Scope::Global]
            [&QueueFilter::All];
        assert_eq!(all.win_rate, 1.0 / 3.0);
        assert_eq!(all.average_placement, 5.0 / 3.0);

        let original = CacheSnapshot {
            community_id: community.clone(),
            built_at: at(10),
            entries,
        };
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save_snapshot(&original).await.unwrap();
        let loaded = store.load_snapshot(&community).await.unwrap();

        assert_eq!(loaded, Some(original));
    }

    #[tokio::test]
    async fn test_load_missing_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = store(&temp_dir).load_snapshot(&"nobody".into()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete_snapshots() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save_snapshot(&snapshot("beta")).await.unwrap();
        store.save_snapshot(&snapshot("alpha")).await.unwrap();

        let listed = store.list_snapshots().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|m| m.community_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(listed[0].user_count, 2);

        assert_ok!(store.delete_snapshot(&"alpha".into()).await);
        // Deleting again is a no-op
        assert_ok!(store.delete_snapshot(&"alpha".into()).await);
        let listed = store.list_snapshots().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.load_snapshot(&"alpha".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roster_latest_line_wins() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let guild = CommunityId::from("guild");

        store.add_member(&guild, &UserRecord::new("p1", "Old Name")).unwrap();
        store.add_member(&guild, &UserRecord::new("p2", "Second")).unwrap();
        store.add_member(&guild, &UserRecord::new("p1", "New Name")).unwrap();

        let roster = store.community_roster(&guild).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[&PlayerId::from("p1")].display_name, "New Name");
        assert_eq!(store.list_communities().unwrap(), vec![guild]);
    }

    #[tokio::test]
    async fn test_unknown_community_has_empty_roster() {
        let temp_dir = TempDir::new().unwrap();
        let roster = store(&temp_dir).community_roster(&"ghost".into()).await.unwrap();
        assert!(roster.is_empty());
    }

    #[tokio::test]
    async fn test_unsafe_community_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = store(&temp_dir).delete_snapshot(&"../outside".into()).await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }
}
