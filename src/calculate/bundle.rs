//! Stat bundle construction for every (window, scope, queue) combination.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::PlayerMatches;
use crate::models::{
    BundleTree, CommunityId, MatchMap, PlayerId, QueueFilter, Scope, Season, StatBundle,
    TimeWindow, NO_DATA,
};

impl<'a> PlayerMatches<'a> {
    /// Summarize the matches in this view.
    pub fn bundle(&self) -> StatBundle {
        if self.is_empty() {
            return StatBundle::empty();
        }

        StatBundle {
            win_rate: self.win_rate(),
            average_score: self.average_score(),
            best_score: self.best_score().map(|h| h.score).unwrap_or(NO_DATA),
            events_played: self.matches_played(),
            average_placement: self.average_placement(),
            longest_win_streak: self.win_streak().longest,
        }
    }
}

/// Bundle over a player's whole history.
pub fn build_bundle(matches: &MatchMap, player: &PlayerId) -> StatBundle {
    PlayerMatches::new(matches, player).bundle()
}

/// Every bundle combination for one player, as of `now`.
pub fn build_bundles(
    matches: &MatchMap,
    player: &PlayerId,
    community: &CommunityId,
    season: &Season,
    now: DateTime<Utc>,
) -> BundleTree {
    let history = PlayerMatches::new(matches, player);
    let mut tree = BundleTree::new();

    for window in TimeWindow::ALL {
        let in_window = history.filter(|m| window.includes(m, season, now));
        let mut by_scope = BTreeMap::new();

        for scope in Scope::ALL {
            let in_scope = in_window.filter(|m| scope.includes(m, community));
            let by_queue = QueueFilter::ALL
                .into_iter()
                .map(|queue| (queue, in_scope.filter(|m| queue.includes(m)).bundle()))
                .collect();
            by_scope.insert(scope, by_queue);
        }

        tree.insert(window, by_scope);
    }

    tree
}
