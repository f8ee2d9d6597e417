//! Match record model: one completed, scored event.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommunityId, MatchId, PlayerId};

/// A player's matches keyed by match id.
pub type MatchMap = HashMap<MatchId, MatchRecord>;

/// Queue tier the match was played in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueTier {
    /// Team queue (premade squads)
    Squad,
    /// Solo queue
    Solo,
}

/// One player's line in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player_id: PlayerId,

    /// Match score; absent when the upstream record is incomplete
    #[serde(default)]
    pub score: Option<f64>,

    /// Rating change caused by this match
    #[serde(default)]
    pub rating_delta: f64,

    /// Rating before the match, used for seeding
    #[serde(default)]
    pub previous_rating: f64,
}

impl PlayerResult {
    pub fn new(player_id: impl Into<PlayerId>, score: f64) -> Self {
        Self {
            player_id: player_id.into(),
            score: Some(score),
            rating_delta: 0.0,
            previous_rating: 0.0,
        }
    }

    pub fn with_rating_delta(mut self, delta: f64) -> Self {
        self.rating_delta = delta;
        self
    }

    pub fn with_previous_rating(mut self, rating: f64) -> Self {
        self.previous_rating = rating;
        self
    }
}

/// A team and its final team placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub rank: u32,
    #[serde(default)]
    pub players: Vec<PlayerResult>,
}

impl Team {
    pub fn new(rank: u32, players: Vec<PlayerResult>) -> Self {
        Self { rank, players }
    }
}

/// A completed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,

    pub timestamp: DateTime<Utc>,

    /// Season number the match counted towards
    pub season: u32,

    pub tier: QueueTier,

    /// Team size descriptor, e.g. "4v4" or "1v1v1"
    pub format: String,

    /// Community the match was hosted in, if any
    #[serde(default)]
    pub community_id: Option<CommunityId>,

    #[serde(default)]
    pub teams: Vec<Team>,
}

impl MatchRecord {
    pub fn new(
        id: impl Into<MatchId>,
        timestamp: DateTime<Utc>,
        tier: QueueTier,
        teams: Vec<Team>,
    ) -> Self {
        let format = teams
            .iter()
            .map(|t| t.players.len().to_string())
            .collect::<Vec<_>>()
            .join("v");

        Self {
            id: id.into(),
            timestamp,
            season: 0,
            tier,
            format,
            community_id: None,
            teams,
        }
    }

    pub fn with_season(mut self, season: u32) -> Self {
        self.season = season;
        self
    }

    pub fn with_community(mut self, community: impl Into<CommunityId>) -> Self {
        self.community_id = Some(community.into());
        self
    }

    /// A record is usable when it has at least one team and every listed
    /// player carries a score.
    pub fn is_well_formed(&self) -> bool {
        !self.teams.is_empty()
            && self.teams.iter().any(|t| !t.players.is_empty())
            && self
                .teams
                .iter()
                .flat_map(|t| t.players.iter())
                .all(|p| p.score.is_some())
    }

    /// Whether the player appears in any team.
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.result_for(player).is_some()
    }

    /// First result line for the player.
    pub fn result_for(&self, player: &PlayerId) -> Option<&PlayerResult> {
        self.teams
            .iter()
            .flat_map(|t| t.players.iter())
            .find(|p| &p.player_id == player)
    }

    /// Team the player is listed on.
    pub fn team_of(&self, player: &PlayerId) -> Option<&Team> {
        self.teams
            .iter()
            .find(|t| t.players.iter().any(|p| &p.player_id == player))
    }

    /// All player lines, in team order.
    pub fn player_results(&self) -> impl Iterator<Item = &PlayerResult> {
        self.teams.iter().flat_map(|t| t.players.iter())
    }
}
