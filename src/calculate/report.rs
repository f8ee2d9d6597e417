//! Full per-player report computed live from match history.

use serde::{Deserialize, Serialize};

use super::{
    PerformanceHighlight, PlayerMatches, ScoreHighlight, TeammateHighlight, WinStreak,
};
use crate::models::{MatchMap, PlayerId};

/// Every engine metric for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerReport {
    pub player_id: PlayerId,
    pub matches_played: u32,
    pub win_rate: f64,
    pub average_score: f64,
    pub average_placement: f64,
    pub average_seed: f64,
    pub best_score: Option<ScoreHighlight>,
    pub worst_score: Option<ScoreHighlight>,
    pub overperformance: Option<PerformanceHighlight>,
    pub underperformance: Option<PerformanceHighlight>,
    pub carry: Option<TeammateHighlight>,
    pub anchor: Option<TeammateHighlight>,
    pub win_streak: WinStreak,
}

impl PlayerReport {
    pub fn compute(matches: &MatchMap, player: &PlayerId) -> Self {
        let view = PlayerMatches::new(matches, player);

        Self {
            player_id: player.clone(),
            matches_played: view.matches_played(),
            win_rate: view.win_rate(),
            average_score: view.average_score(),
            average_placement: view.average_placement(),
            average_seed: view.average_seed(),
            best_score: view.best_score(),
            worst_score: view.worst_score(),
            overperformance: view.overperformance(),
            underperformance: view.underperformance(),
            carry: view.carry(),
            anchor: view.anchor(),
            win_streak: view.win_streak(),
        }
    }
}
