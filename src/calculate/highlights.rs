//! Single-match highlights: extreme scores, performance against seed, and
//! performance against teammates.

use serde::{Deserialize, Serialize};

use super::{player_rank, player_seed, PlayerMatches};
use crate::models::{MatchId, MatchMap, PlayerId};

/// A notable score and where it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHighlight {
    pub score: f64,
    pub placement: u32,
    pub match_id: MatchId,
}

/// Seed minus rank in one match; positive means the player beat expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceHighlight {
    pub difference: i64,
    pub seed: u32,
    pub placement: u32,
    pub score: f64,
    pub match_id: MatchId,
}

/// Player score minus the mean score of the other teammates in one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeammateHighlight {
    pub difference: f64,
    pub score: f64,
    pub teammate_average: f64,
    pub match_id: MatchId,
}

impl<'a> PlayerMatches<'a> {
    fn score_lines(&self) -> impl Iterator<Item = ScoreHighlight> + '_ {
        self.iter().filter_map(|m| {
            let score = m.result_for(self.player())?.score?;
            let placement = player_rank(m, self.player())?;
            Some(ScoreHighlight {
                score,
                placement,
                match_id: m.id.clone(),
            })
        })
    }

    fn performance_lines(&self) -> impl Iterator<Item = PerformanceHighlight> + '_ {
        self.iter().filter_map(|m| {
            let score = m.result_for(self.player())?.score?;
            let placement = player_rank(m, self.player())?;
            let seed = player_seed(m, self.player())?;
            Some(PerformanceHighlight {
                difference: i64::from(seed) - i64::from(placement),
                seed,
                placement,
                score,
                match_id: m.id.clone(),
            })
        })
    }

    fn teammate_lines(&self) -> impl Iterator<Item = TeammateHighlight> + '_ {
        self.iter().filter_map(|m| {
            let player = self.player();
            let score = m.result_for(player)?.score?;
            let team = m.team_of(player)?;
            let others: Vec<f64> = team
                .players
                .iter()
                .filter(|p| &p.player_id != player)
                .filter_map(|p| p.score)
                .collect();
            if others.is_empty() {
                return None;
            }
            let teammate_average = others.iter().sum::<f64>() / others.len() as f64;
            Some(TeammateHighlight {
                difference: score - teammate_average,
                score,
                teammate_average,
                match_id: m.id.clone(),
            })
        })
    }

    /// Highest score; the earliest match wins ties.
    pub fn best_score(&self) -> Option<ScoreHighlight> {
        self.score_lines().fold(None, |best, line| match best {
            Some(b) if line.score <= b.score => Some(b),
            _ => Some(line),
        })
    }

    /// Lowest score; the earliest match wins ties.
    pub fn worst_score(&self) -> Option<ScoreHighlight> {
        self.score_lines().fold(None, |worst, line| match worst {
            Some(w) if line.score >= w.score => Some(w),
            _ => Some(line),
        })
    }

    /// Largest seed - rank; ties go to the higher score.
    pub fn overperformance(&self) -> Option<PerformanceHighlight> {
        self.performance_lines().fold(None, |best, line| match best {
            Some(b)
                if line.difference < b.difference
                    || (line.difference == b.difference && line.score <= b.score) =>
            {
                Some(b)
            }
            _ => Some(line),
        })
    }

    /// Smallest seed - rank; ties go to the lower score.
    pub fn underperformance(&self) -> Option<PerformanceHighlight> {
        self.performance_lines().fold(None, |worst, line| match worst {
            Some(w)
                if line.difference > w.difference
                    || (line.difference == w.difference && line.score >= w.score) =>
            {
                Some(w)
            }
            _ => Some(line),
        })
    }

    /// Match where the player most outscored their teammates.
    pub fn carry(&self) -> Option<TeammateHighlight> {
        self.teammate_lines().fold(None, |best, line| match best {
            Some(b) if line.difference <= b.difference => Some(b),
            _ => Some(line),
        })
    }

    /// Match where the player fell furthest behind their teammates.
    pub fn anchor(&self) -> Option<TeammateHighlight> {
        self.teammate_lines().fold(None, |worst, line| match worst {
            Some(w) if line.difference >= w.difference => Some(w),
            _ => Some(line),
        })
    }
}

pub fn best_score(matches: &MatchMap, player: &PlayerId) -> Option<ScoreHighlight> {
    PlayerMatches::new(matches, player).best_score()
}

pub fn worst_score(matches: &MatchMap, player: &PlayerId) -> Option<ScoreHighlight> {
    PlayerMatches::new(matches, player).worst_score()
}

pub fn overperformance(matches: &MatchMap, player: &PlayerId) -> Option<PerformanceHighlight> {
    PlayerMatches::new(matches, player).overperformance()
}

pub fn underperformance(matches: &MatchMap, player: &PlayerId) -> Option<PerformanceHighlight> {
    PlayerMatches::new(matches, player).underperformance()
}

pub fn carry(matches: &MatchMap, player: &PlayerId) -> Option<TeammateHighlight> {
    PlayerMatches::new(matches, player).carry()
}

pub fn anchor(matches: &MatchMap, player: &PlayerId) -> Option<TeammateHighlight> {
    PlayerMatches::new(matches, player).anchor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::fixtures::*;
    use crate::calculate::match_map;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    #[test]
    fn test_best_and_worst_score() {
        let matches = match_map([
            solo_match("m1", 0, vec![line("p1", 40.0, 0.0, 0.0), line("p2", 50.0, 0.0, 0.0)]),
            solo_match("m2", 1, vec![line("p1", 70.0, 0.0, 0.0), line("p2", 10.0, 0.0, 0.0)]),
            solo_match("m3", 2, vec![line("p1", 20.0, 0.0, 0.0), line("p2", 30.0, 0.0, 0.0)]),
        ]);
        let p = pid("p1");

        let best = best_score(&matches, &p).unwrap();
        assert_eq!(best.score, 70.0);
        assert_eq!(best.placement, 1);
        assert_eq!(best.match_id.as_str(), "m2");

        let worst = worst_score(&matches, &p).unwrap();
        assert_eq!(worst.score, 20.0);
        assert_eq!(worst.placement, 2);
        assert_eq!(worst.match_id.as_str(), "m3");
    }

    #[test]
    fn test_best_score_tie_keeps_first_encountered() {
        let matches = match_map([
            solo_match("later", 5, vec![line("p1", 60.0, 0.0, 0.0)]),
            solo_match("earlier", 1, vec![line("p1", 60.0, 0.0, 0.0)]),
        ]);
        let best = best_score(&matches, &pid("p1")).unwrap();
        assert_eq!(best.match_id.as_str(), "earlier");
    }

    #[test]
    fn test_overperformance_and_underperformance() {
        // m1: seeded 3rd, finished 1st => +2
        // m2: seeded 1st, finished 3rd => -2
        let matches = match_map([
            solo_match(
                "m1",
                0,
                vec![
                    line("p1", 90.0, 0.0, 1000.0),
                    line("p2", 50.0, 0.0, 1200.0),
                    line("p3", 40.0, 0.0, 1100.0),
                ],
            ),
            solo_match(
                "m2",
                1,
                vec![
                    line("p1", 10.0, 0.0, 1500.0),
                    line("p2", 50.0, 0.0, 1200.0),
                    line("p3", 40.0, 0.0, 1100.0),
                ],
            ),
        ]);
        let p = pid("p1");

        let over = overperformance(&matches, &p).unwrap();
        assert_eq!(over.difference, 2);
        assert_eq!(over.match_id.as_str(), "m1");

        let under = underperformance(&matches, &p).unwrap();
        assert_eq!(under.difference, -2);
        assert_eq!(under.match_id.as_str(), "m2");
    }

    #[test]
    fn test_overperformance_tie_prefers_higher_score() {
        let matches = match_map([
            solo_match("low", 0, vec![line("p1", 20.0, 0.0, 100.0), line("p2", 10.0, 0.0, 50.0)]),
            solo_match("high", 1, vec![line("p1", 80.0, 0.0, 100.0), line("p2", 10.0, 0.0, 50.0)]),
        ]);
        let p = pid("p1");

        assert_eq!(overperformance(&matches, &p).unwrap().match_id.as_str(), "high");
        assert_eq!(underperformance(&matches, &p).unwrap().match_id.as_str(), "low");
    }

    #[test]
    fn test_carry_against_teammate() {
        let matches = match_map([team_match(
            "m1",
            0,
            vec![
                vec![line("p1", 90.0, 0.0, 0.0), line("p2", 80.0, 0.0, 0.0)],
                vec![line("p3", 70.0, 0.0, 0.0)],
            ],
        )]);

        let c = carry(&matches, &pid("p1")).unwrap();
        assert_eq!(c.difference, 10.0);
        assert_eq!(c.teammate_average, 80.0);
        assert!(carry(&matches, &pid("p3")).is_none());
    }

    #[test]
    fn test_carry_and_anchor_pick_extremes() {
        let matches = match_map([
            team_match(
                "m1",
                0,
                vec![vec![
                    line("p1", 50.0, 0.0, 0.0),
                    line("p2", 20.0, 0.0, 0.0),
                    line("p3", 40.0, 0.0, 0.0),
                ]],
            ),
            team_match(
                "m2",
                1,
                vec![vec![line("p1", 10.0, 0.0, 0.0), line("p2", 60.0, 0.0, 0.0)]],
            ),
        ]);
        let p = pid("p1");

        let c = carry(&matches, &p).unwrap();
        assert_eq!(c.match_id.as_str(), "m1");
        assert_eq!(c.difference, 20.0);

        let a = anchor(&matches, &p).unwrap();
        assert_eq!(a.match_id.as_str(), "m2");
        assert_eq!(a.difference, -50.0);
    }

    #[test]
    fn test_solo_formats_have_no_carry() {
        let matches = match_map([solo_match(
            "m1",
            0,
            vec![
                line("p1", 90.0, 0.0, 0.0),
                line("p2", 80.0, 0.0, 0.0),
                line("p3", 70.0, 0.0, 0.0),
            ],
        )]);
        assert!(carry(&matches, &pid("p1")).is_none());
        assert!(anchor(&matches, &pid("p1")).is_none());
    }

    #[test]
    fn test_empty_history_has_no_highlights() {
        let matches = MatchMap::new();
        let p = pid("p1");
        assert!(best_score(&matches, &p).is_none());
        assert!(worst_score(&matches, &p).is_none());
        assert!(overperformance(&matches, &p).is_none());
        assert!(underperformance(&matches, &p).is_none());
        assert!(carry(&matches, &p).is_none());
        assert!(anchor(&matches, &p).is_none());
    }
}
