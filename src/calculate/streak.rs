//! Win streaks and head-to-head records.

use serde::{Deserialize, Serialize};

use super::{player_rank, PlayerMatches};
use crate::models::{MatchMap, PlayerId};

/// Streak state after walking a player's matches in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WinStreak {
    /// Wins since the last non-win
    pub current: u32,
    /// Rating gained during the current streak
    pub current_gain: f64,
    pub longest: u32,
    /// Rating gained during the longest streak
    pub longest_gain: f64,
}

impl WinStreak {
    /// Fold one match result into the streak.
    ///
    /// Only an individual first place counts as a win.
    pub fn record(&mut self, won: bool, rating_delta: f64) {
        if !won {
            self.current = 0;
            self.current_gain = 0.0;
            return;
        }

        self.current += 1;
        self.current_gain += rating_delta;

        if self.current > self.longest
            || (self.current == self.longest && self.current_gain > self.longest_gain)
        {
            self.longest = self.current;
            self.longest_gain = self.current_gain;
        }
    }
}

/// Record of player `a` against player `b` in matches both played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl HeadToHead {
    pub fn meetings(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

impl<'a> PlayerMatches<'a> {
    pub fn win_streak(&self) -> WinStreak {
        let player = self.player();
        let mut streak = WinStreak::default();
        for m in self.iter() {
            let won = player_rank(m, player) == Some(1);
            let delta = m.result_for(player).map(|r| r.rating_delta).unwrap_or(0.0);
            streak.record(won, delta);
        }
        streak
    }

    /// Compare individual ranks against `opponent` in every shared match.
    pub fn head_to_head(&self, opponent: &PlayerId) -> HeadToHead {
        let player = self.player();
        let mut record = HeadToHead::default();
        for m in self.iter() {
            let (Some(mine), Some(theirs)) = (player_rank(m, player), player_rank(m, opponent))
            else {
                continue;
            };
            match mine.cmp(&theirs) {
                std::cmp::Ordering::Less => record.wins += 1,
                std::cmp::Ordering::Greater => record.losses += 1,
                std::cmp::Ordering::Equal => record.ties += 1,
            }
        }
        record
    }
}

pub fn win_streak(matches: &MatchMap, player: &PlayerId) -> WinStreak {
    PlayerMatches::new(matches, player).win_streak()
}

/// Head-to-head from `a`'s point of view.
pub fn head_to_head(matches: &MatchMap, a: &PlayerId, b: &PlayerId) -> HeadToHead {
    if a == b {
        return HeadToHead::default();
    }
    PlayerMatches::new(matches, a).head_to_head(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::fixtures::*;
    use crate::calculate::match_map;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    /// Solo match where p1 finishes first when `won`, second otherwise.
    fn p1_result(id: &str, minutes: i64, won: bool, delta: f64) -> crate::models::MatchRecord {
        let (mine, theirs) = if won { (20.0, 10.0) } else { (10.0, 20.0) };
        solo_match(
            id,
            minutes,
            vec![line("p1", mine, delta, 0.0), line("p2", theirs, -delta, 0.0)],
        )
    }

    #[test]
    fn test_streak_counts_consecutive_wins() {
        let matches = match_map([
            p1_result("m1", 0, true, 10.0),
            p1_result("m2", 1, true, 12.0),
            p1_result("m3", 2, false, -8.0),
            p1_result("m4", 3, true, 5.0),
        ]);

        let s = win_streak(&matches, &pid("p1"));
        assert_eq!(s.longest, 2);
        assert_eq!(s.longest_gain, 22.0);
        assert_eq!(s.current, 1);
        assert_eq!(s.current_gain, 5.0);
    }

    #[test]
    fn test_non_win_resets_current_streak() {
        let matches = match_map([
            p1_result("m1", 0, true, 10.0),
            p1_result("m2", 1, true, 10.0),
            p1_result("m3", 2, false, -3.0),
        ]);

        let s = win_streak(&matches, &pid("p1"));
        assert_eq!(s.current, 0);
        assert_eq!(s.current_gain, 0.0);
        assert_eq!(s.longest, 2);
    }

    #[test]
    fn test_longest_tie_prefers_higher_gain() {
        let matches = match_map([
            p1_result("m1", 0, true, 5.0),
            p1_result("m2", 1, true, 5.0),
            p1_result("m3", 2, false, -5.0),
            p1_result("m4", 3, true, 20.0),
            p1_result("m5", 4, true, 20.0),
            p1_result("m6", 5, false, -5.0),
        ]);

        let s = win_streak(&matches, &pid("p1"));
        assert_eq!(s.longest, 2);
        assert_eq!(s.longest_gain, 40.0);
    }

    #[test]
    fn test_team_win_without_first_place_is_not_a_win() {
        let matches = match_map([team_match(
            "m1",
            0,
            vec![
                vec![line("p2", 90.0, 10.0, 0.0), line("p1", 80.0, 10.0, 0.0)],
                vec![line("p3", 70.0, -10.0, 0.0)],
            ],
        )]);

        let s = win_streak(&matches, &pid("p1"));
        assert_eq!(s.longest, 0);
    }

    #[test]
    fn test_streak_monotonicity() {
        let outcomes = [true, false, true, true, true, false, true, true, false, false, true];
        let mut streak = WinStreak::default();
        for won in outcomes {
            streak.record(won, 3.0);
            assert!(streak.longest >= streak.current);
            if !won {
                assert_eq!(streak.current, 0);
                assert_eq!(streak.current_gain, 0.0);
            }
        }
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn test_head_to_head() {
        let matches = match_map([
            p1_result("m1", 0, true, 5.0),
            p1_result("m2", 1, false, -5.0),
            p1_result("m3", 2, true, 5.0),
            solo_match(
                "m4",
                3,
                vec![line("p1", 15.0, 0.0, 0.0), line("p2", 15.0, 0.0, 0.0)],
            ),
            solo_match("m5", 4, vec![line("p1", 15.0, 0.0, 0.0), line("p3", 5.0, 0.0, 0.0)]),
        ]);

        let h = head_to_head(&matches, &pid("p1"), &pid("p2"));
        assert_eq!(
            h,
            HeadToHead {
                wins: 2,
                losses: 1,
                ties: 1
            }
        );
        assert_eq!(h.meetings(), 4);

        let reverse = head_to_head(&matches, &pid("p2"), &pid("p1"));
        assert_eq!(reverse.wins, 1);
        assert_eq!(reverse.losses, 2);
    }

    #[test]
    fn test_head_to_head_without_shared_matches() {
        let matches = match_map([p1_result("m1", 0, true, 5.0)]);
        assert_eq!(
            head_to_head(&matches, &pid("p1"), &pid("p9")),
            HeadToHead::default()
        );
        assert_eq!(win_streak(&MatchMap::new(), &pid("p1")), WinStreak::default());
    }
}
