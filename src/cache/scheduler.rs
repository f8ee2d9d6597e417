//! Refresh-ahead scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::StatCache;
use crate::models::CommunityId;

impl StatCache {
    /// Communities whose entries are older than the refresh-ahead threshold.
    pub async fn due_for_refresh(&self, now: DateTime<Utc>) -> Vec<CommunityId> {
        let threshold = self.config.refresh_ahead;
        let mut due: Vec<CommunityId> = self
            .communities
            .read()
            .await
            .iter()
            .filter(|(_, c)| c.invalidated || c.age(now) > threshold)
            .map(|(id, _)| id.clone())
            .collect();
        due.sort();
        due
    }

    /// Start background refreshes for every due community. Returns how many
    /// were started.
    pub async fn refresh_ahead_scan(self: &Arc<Self>) -> usize {
        let due = self.due_for_refresh(Utc::now()).await;
        let started = due.iter().filter(|c| self.spawn_refresh(c)).count();
        if started > 0 {
            info!("Refresh-ahead started {} of {} due communities", started, due.len());
        } else {
            debug!("Refresh-ahead scan: nothing to start");
        }
        started
    }

    /// Run [`Self::refresh_ahead_scan`] every `scan_interval` until aborted.
    pub fn spawn_refresh_ahead(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(cache.config.scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "Starting refresh-ahead scans every {:?}",
                cache.config.scan_interval
            );

            loop {
                ticker.tick().await;
                cache.refresh_ahead_scan().await;
            }
        })
    }
}
