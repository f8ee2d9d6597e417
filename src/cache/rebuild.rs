//! Community rebuilds: batched per-user recomputation and commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{CacheError, CommunityCache, RefreshGuard, RefreshOutcome, StatCache};
use crate::calculate::build_bundles;
use crate::models::{
    CacheSnapshot, CommunityEntries, CommunityId, PlayerId, RatingWindow, UserCacheEntry,
    UserRecord,
};
use crate::source::SourceError;

enum Commit {
    Replaced((Arc<CommunityEntries>, DateTime<Utc>)),
    Discarded,
    KeptPrevious,
}

impl StatCache {
    /// Rebuild a community while holding its refresh guard.
    pub(super) async fn rebuild(
        &self,
        community: &CommunityId,
        guard: RefreshGuard,
    ) -> Result<RefreshOutcome, CacheError> {
        let started = Instant::now();
        let roster = self.store.community_roster(community).await?;
        let roster_size = roster.len();

        let entries = self.build_entries(community, roster).await;
        let user_count = entries.len();

        let committed = {
            let mut communities = self.communities.write().await;
            if guard.flight.is_discarded() {
                Commit::Discarded
            } else if user_count == 0 && roster_size > 0 && communities.contains_key(community) {
                Commit::KeptPrevious
            } else {
                let generation = CommunityCache::new(entries, Utc::now());
                let committed = (Arc::clone(&generation.entries), generation.built_at);
                communities.insert(community.clone(), generation);
                Commit::Replaced(committed)
            }
        };

        let (entries, built_at) = match committed {
            Commit::Replaced(committed) => committed,
            Commit::Discarded => {
                info!("Discarding rebuild of cleared community {}", community);
                return Ok(RefreshOutcome::Discarded);
            }
            Commit::KeptPrevious => {
                warn!(
                    "Rebuild of {} produced no entries for {} members, keeping previous entries",
                    community, roster_size
                );
                return Ok(RefreshOutcome::KeptPrevious { roster_size });
            }
        };

        info!(
            "Rebuilt {}: {}/{} users in {:.1}s",
            community,
            user_count,
            roster_size,
            started.elapsed().as_secs_f64()
        );
        self.persist(community.clone(), entries, built_at);

        Ok(RefreshOutcome::Completed { user_count })
    }

    /// Compute entries for every roster member, `batch_size` users at a time.
    ///
    /// Members that fail or have no profile are left out.
    async fn build_entries(
        &self,
        community: &CommunityId,
        roster: HashMap<PlayerId, UserRecord>,
    ) -> CommunityEntries {
        let mut members: Vec<UserRecord> = roster.into_values().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let now = Utc::now();
        let batch_size = self.config.batch_size.max(1);
        let mut entries = CommunityEntries::with_capacity(members.len());

        for (index, batch) in members.chunks(batch_size).enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|member| self.build_user(member, community, now)),
            )
            .await;

            for (member, result) in batch.iter().zip(results) {
                match result {
                    Ok(Some(entry)) => {
                        entries.insert(entry.user_id.clone(), entry);
                    }
                    Ok(None) => debug!("No profile for {}, skipping", member.user_id),
                    Err(e) => warn!(
                        "Failed to build stats for {} in {}: {}",
                        member.user_id, community, e
                    ),
                }
            }
        }

        entries
    }

    async fn build_user(
        &self,
        member: &UserRecord,
        community: &CommunityId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserCacheEntry>, SourceError> {
        let player = &member.user_id;
        let Some(profile) = self.source.profile(player).await? else {
            return Ok(None);
        };

        let matches = self.source.all_matches(player, community).await?;
        let bundles = build_bundles(&matches, player, community, &self.season, now);

        let current_rating = self.source.current_rating(player).await?;
        let weekly_rating_delta = self.source.rating_delta(player, RatingWindow::Weekly).await?;
        let seasonal_rating_delta = self
            .source
            .rating_delta(player, RatingWindow::Seasonal)
            .await?;

        let display_name = if profile.display_name.is_empty() {
            member.display_name.clone()
        } else {
            profile.display_name
        };

        Ok(Some(UserCacheEntry {
            user_id: player.clone(),
            display_name,
            current_rating,
            weekly_rating_delta,
            seasonal_rating_delta,
            bundles,
        }))
    }

    /// Save a snapshot in the background. Failures are logged only.
    ///
    /// Skipped when the generation was replaced or cleared before the task ran.
    fn persist(&self, community: CommunityId, entries: Arc<CommunityEntries>, built_at: DateTime<Utc>) {
        let store = Arc::clone(&self.store);
        let communities = Arc::clone(&self.communities);

        tokio::spawn(async move {
            let current = communities
                .read()
                .await
                .get(&community)
                .is_some_and(|c| Arc::ptr_eq(&c.entries, &entries));
            if !current {
                debug!("Snapshot of {} superseded, not saving", community);
                return;
            }

            let snapshot = CacheSnapshot {
                community_id: community.clone(),
                built_at,
                entries: (*entries).clone(),
            };
            if let Err(e) = store.save_snapshot(&snapshot).await {
                warn!("Failed to save snapshot for {}: {}", community, e);
            }
        });
    }
}
