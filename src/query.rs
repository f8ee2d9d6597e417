//! Leaderboard queries over cached community entries.

use serde::{Deserialize, Serialize};

use crate::models::{
    CommunityEntries, PlayerId, QueueFilter, Scope, StatKind, TimeWindow, UserCacheEntry, NO_DATA,
};

/// Leaderboard length when none is configured.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// What to rank a community by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub stat: StatKind,
    pub window: TimeWindow,
    pub scope: Scope,
    pub queue: QueueFilter,
}

impl LeaderboardQuery {
    /// All-time, global, every queue.
    pub fn new(stat: StatKind) -> Self {
        Self {
            stat,
            window: TimeWindow::AllTime,
            scope: Scope::Global,
            queue: QueueFilter::All,
        }
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn queue(mut self, queue: QueueFilter) -> Self {
        self.queue = queue;
        self
    }
}

/// One ranked line of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based position
    pub position: usize,
    pub user_id: PlayerId,
    pub display_name: String,
    pub value: f64,
}

/// The value `entry` is ranked by, or `None` when the user is not eligible.
///
/// Rating statistics ignore the window and scope filters but still require
/// at least one recorded match. Rating changes only rank gains.
pub fn stat_value(entry: &UserCacheEntry, query: &LeaderboardQuery) -> Option<f64> {
    let bundle = if query.stat.is_rating() {
        entry.bundle(TimeWindow::AllTime, Scope::Global, QueueFilter::All)?
    } else {
        entry.bundle(query.window, query.scope, query.queue)?
    };
    if bundle.events_played == 0 {
        return None;
    }

    let value = match query.stat {
        StatKind::WinRate => bundle.win_rate,
        StatKind::AverageScore => bundle.average_score,
        StatKind::BestScore => bundle.best_score,
        StatKind::EventsPlayed => f64::from(bundle.events_played),
        StatKind::AveragePlacement => bundle.average_placement,
        StatKind::LongestWinStreak => f64::from(bundle.longest_win_streak),
        StatKind::CurrentRating => return Some(entry.current_rating),
        StatKind::WeeklyRatingChange => entry.weekly_rating_delta,
        StatKind::SeasonalRatingChange => entry.seasonal_rating_delta,
    };

    match query.stat {
        StatKind::WeeklyRatingChange | StatKind::SeasonalRatingChange => {
            (value > 0.0).then_some(value)
        }
        _ => (value != NO_DATA).then_some(value),
    }
}

/// Rank eligible users and keep the top `limit`.
///
/// Values sort descending, except placement which sorts ascending. Equal
/// values fall back to display name, then user id.
pub fn rank_leaderboard(
    entries: &CommunityEntries,
    query: &LeaderboardQuery,
    limit: usize,
) -> Vec<LeaderboardRow> {
    let mut eligible: Vec<(&UserCacheEntry, f64)> = entries
        .values()
        .filter_map(|e| stat_value(e, query).map(|v| (e, v)))
        .collect();

    eligible.sort_by(|(a, av), (b, bv)| {
        let by_value = if query.stat.higher_is_better() {
            bv.total_cmp(av)
        } else {
            av.total_cmp(bv)
        };
        by_value
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    eligible
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (entry, value))| LeaderboardRow {
            position: i + 1,
            user_id: entry.user_id.clone(),
            display_name: entry.display_name.clone(),
            value,
        })
        .collect()
}
