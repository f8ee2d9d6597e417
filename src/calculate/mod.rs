//! Statistics calculation engine.
//!
//! Pure functions from a player's match history to derived statistics:
//! - Individual ranking and seeding within a match
//! - Win rate and score/placement/seed averages
//! - Best/worst matches, over/underperformance, carry/anchor
//! - Head-to-head records and win streaks
//!
//! Nothing here performs I/O. Malformed match records (no teams, missing
//! scores) are skipped, and every aggregate reports [`NO_DATA`] instead of
//! failing when no match qualifies.

mod bundle;
mod highlights;
mod report;
mod streak;

pub use bundle::*;
pub use highlights::*;
pub use report::*;
pub use streak::*;

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{MatchMap, MatchRecord, PlayerId, NO_DATA};

/// A player's position in one match, ordered by score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<'a> {
    pub player_id: &'a PlayerId,
    pub score: f64,
    pub rank: u32,
    /// Another entry shares this rank
    pub tied: bool,
}

/// A player's expected position in one match, ordered by prior rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeededEntry<'a> {
    pub player_id: &'a PlayerId,
    pub previous_rating: f64,
    pub seed: u32,
}

/// Standard competition ranking of every player in a match ("1224").
pub fn individual_ranking(record: &MatchRecord) -> Vec<RankedEntry<'_>> {
    if !record.is_well_formed() {
        return Vec::new();
    }

    let mut scored: Vec<(&PlayerId, f64)> = record
        .player_results()
        .filter_map(|p| p.score.map(|s| (&p.player_id, s)))
        .collect();
    // Stable: equal scores keep team order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(scored.len());
    let mut rank = 0;
    let mut previous: Option<f64> = None;
    for (position, (player_id, score)) in scored.into_iter().enumerate() {
        if previous != Some(score) {
            rank = position as u32 + 1;
            previous = Some(score);
        }
        ranked.push(RankedEntry {
            player_id,
            score,
            rank,
            tied: false,
        });
    }

    let mut per_rank: HashMap<u32, usize> = HashMap::new();
    for entry in &ranked {
        *per_rank.entry(entry.rank).or_default() += 1;
    }
    for entry in &mut ranked {
        entry.tied = per_rank.get(&entry.rank).copied().unwrap_or(0) > 1;
    }

    ranked
}

/// Seeding of every player in a match by previous rating; ties keep listing order.
pub fn individual_seeds(record: &MatchRecord) -> Vec<SeededEntry<'_>> {
    if !record.is_well_formed() {
        return Vec::new();
    }

    let mut rated: Vec<(&PlayerId, f64)> = record
        .player_results()
        .map(|p| (&p.player_id, p.previous_rating))
        .collect();
    rated.sort_by(|a, b| b.1.total_cmp(&a.1));

    rated
        .into_iter()
        .enumerate()
        .map(|(position, (player_id, previous_rating))| SeededEntry {
            player_id,
            previous_rating,
            seed: position as u32 + 1,
        })
        .collect()
}

/// Individual rank of the player in a match.
pub fn player_rank(record: &MatchRecord, player: &PlayerId) -> Option<u32> {
    individual_ranking(record)
        .into_iter()
        .find(|e| e.player_id == player)
        .map(|e| e.rank)
}

/// Seed of the player in a match.
pub fn player_seed(record: &MatchRecord, player: &PlayerId) -> Option<u32> {
    individual_seeds(record)
        .into_iter()
        .find(|e| e.player_id == player)
        .map(|e| e.seed)
}

/// The well-formed matches a player took part in, oldest first.
///
/// Ordering by (timestamp, id) makes "first encountered" tie-breaks
/// deterministic regardless of map iteration order.
#[derive(Debug, Clone)]
pub struct PlayerMatches<'a> {
    player: &'a PlayerId,
    matches: Vec<&'a MatchRecord>,
}

impl<'a> PlayerMatches<'a> {
    pub fn new(all: &'a MatchMap, player: &'a PlayerId) -> Self {
        Self::from_records(all.values(), player)
    }

    pub fn from_records(
        records: impl IntoIterator<Item = &'a MatchRecord>,
        player: &'a PlayerId,
    ) -> Self {
        let mut matches: Vec<&MatchRecord> = records
            .into_iter()
            .filter(|m| m.is_well_formed() && m.contains(player))
            .collect();
        matches.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Self { player, matches }
    }

    /// Narrow the view, keeping chronological order.
    pub fn filter(&self, predicate: impl Fn(&MatchRecord) -> bool) -> Self {
        Self {
            player: self.player,
            matches: self.matches.iter().copied().filter(|m| predicate(m)).collect(),
        }
    }

    pub fn player(&self) -> &'a PlayerId {
        self.player
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a MatchRecord> + '_ {
        self.matches.iter().copied()
    }

    /// Number of matches, each counted once.
    pub fn matches_played(&self) -> u32 {
        self.matches.len() as u32
    }

    /// Wins over decided matches; zero rating deltas are not decisions.
    pub fn win_rate(&self) -> f64 {
        let (wins, losses) = self
            .iter()
            .filter_map(|m| m.result_for(self.player))
            .fold((0u32, 0u32), |(w, l), r| {
                if r.rating_delta > 0.0 {
                    (w + 1, l)
                } else if r.rating_delta < 0.0 {
                    (w, l + 1)
                } else {
                    (w, l)
                }
            });

        if wins + losses == 0 {
            NO_DATA
        } else {
            wins as f64 / (wins + losses) as f64
        }
    }

    pub fn average_score(&self) -> f64 {
        mean(
            self.iter()
                .filter_map(|m| m.result_for(self.player).and_then(|r| r.score)),
        )
    }

    pub fn average_placement(&self) -> f64 {
        mean(
            self.iter()
                .filter_map(|m| player_rank(m, self.player))
                .map(f64::from),
        )
    }

    pub fn average_seed(&self) -> f64 {
        mean(
            self.iter()
                .filter_map(|m| player_seed(m, self.player))
                .map(f64::from),
        )
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        NO_DATA
    } else {
        sum / count as f64
    }
}

/// Matches containing the player, each counted once.
pub fn matches_played(matches: &MatchMap, player: &PlayerId) -> u32 {
    PlayerMatches::new(matches, player).matches_played()
}

/// Wins / (wins + losses) by rating delta sign, or `NO_DATA`.
pub fn win_rate(matches: &MatchMap, player: &PlayerId) -> f64 {
    PlayerMatches::new(matches, player).win_rate()
}

pub fn average_score(matches: &MatchMap, player: &PlayerId) -> f64 {
    PlayerMatches::new(matches, player).average_score()
}

pub fn average_placement(matches: &MatchMap, player: &PlayerId) -> f64 {
    PlayerMatches::new(matches, player).average_placement()
}

pub fn average_seed(matches: &MatchMap, player: &PlayerId) -> f64 {
    PlayerMatches::new(matches, player).average_seed()
}

/// Build a match map from records, for tests and adapters.
pub fn match_map(records: impl IntoIterator<Item = MatchRecord>) -> MatchMap {
    records.into_iter().map(|m| (m.id.clone(), m)).collect()
}
