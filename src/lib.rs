//! # Ladder Stats
//!
//! Per-community leaderboard statistics, computed from match history and
//! served from a stale-while-revalidate cache.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (match records, stat bundles, cache entries)
//! - **calculate**: Statistics computation over a player's match history
//! - **query**: Leaderboard ranking over cached entries
//! - **cache**: Per-community cache with background refresh
//! - **source**: Match source client (REST)
//! - **storage**: Community rosters and cache snapshots on disk (JSONL)
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod calculate;
pub mod config;
pub mod models;
pub mod query;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s", "250ms").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(n) = s.strip_suffix("ms") {
        let millis: u64 = n.parse().ok()?;
        return Some(Duration::from_millis(millis));
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
