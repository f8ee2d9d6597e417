//! Derived statistics models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CommunityId, MatchRecord, QueueTier, Season};

/// Value reported when a statistic has no qualifying matches.
pub const NO_DATA: f64 = -1.0;

/// Time window a bundle is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    AllTime,
    Weekly,
    Seasonal,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [TimeWindow::AllTime, TimeWindow::Weekly, TimeWindow::Seasonal];

    /// Whether a match falls inside this window as of `now`.
    pub fn includes(&self, record: &MatchRecord, season: &Season, now: DateTime<Utc>) -> bool {
        match self {
            TimeWindow::AllTime => true,
            TimeWindow::Weekly => record.timestamp >= now - Duration::days(7),
            TimeWindow::Seasonal => season.contains(record),
        }
    }
}

/// Which matches count: only those hosted in the community, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Community,
    Global,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Community, Scope::Global];

    pub fn includes(&self, record: &MatchRecord, community: &CommunityId) -> bool {
        match self {
            Scope::Community => record.community_id.as_ref() == Some(community),
            Scope::Global => true,
        }
    }
}

/// Queue filter applied on top of the window and scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFilter {
    All,
    Team,
    Solo,
}

impl QueueFilter {
    pub const ALL: [QueueFilter; 3] = [QueueFilter::All, QueueFilter::Team, QueueFilter::Solo];

    pub fn includes(&self, record: &MatchRecord) -> bool {
        match self {
            QueueFilter::All => true,
            QueueFilter::Team => record.tier == QueueTier::Squad,
            QueueFilter::Solo => record.tier == QueueTier::Solo,
        }
    }
}

/// Rating delta windows exposed by the match source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingWindow {
    Weekly,
    Seasonal,
}

impl fmt::Display for RatingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingWindow::Weekly => write!(f, "weekly"),
            RatingWindow::Seasonal => write!(f, "seasonal"),
        }
    }
}

/// Precomputed statistics for one (window, scope, queue) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBundle {
    /// Wins over decided matches, or `NO_DATA`
    pub win_rate: f64,

    pub average_score: f64,

    /// Highest single-match score, or `NO_DATA`
    pub best_score: f64,

    pub events_played: u32,

    /// Mean individual placement, or `NO_DATA`
    pub average_placement: f64,

    pub longest_win_streak: u32,
}

impl StatBundle {
    /// Bundle for a player with no qualifying matches.
    pub fn empty() -> Self {
        Self {
            win_rate: NO_DATA,
            average_score: NO_DATA,
            best_score: NO_DATA,
            events_played: 0,
            average_placement: NO_DATA,
            longest_win_streak: 0,
        }
    }
}

impl Default for StatBundle {
    fn default() -> Self {
        Self::empty()
    }
}

/// window → scope → queue → bundle
pub type BundleTree = BTreeMap<TimeWindow, BTreeMap<Scope, BTreeMap<QueueFilter, StatBundle>>>;

/// Statistic a leaderboard can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    WinRate,
    AverageScore,
    BestScore,
    EventsPlayed,
    AveragePlacement,
    LongestWinStreak,
    CurrentRating,
    WeeklyRatingChange,
    SeasonalRatingChange,
}

impl StatKind {
    pub const ALL: [StatKind; 9] = [
        StatKind::WinRate,
        StatKind::AverageScore,
        StatKind::BestScore,
        StatKind::EventsPlayed,
        StatKind::AveragePlacement,
        StatKind::LongestWinStreak,
        StatKind::CurrentRating,
        StatKind::WeeklyRatingChange,
        StatKind::SeasonalRatingChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::WinRate => "win_rate",
            StatKind::AverageScore => "average_score",
            StatKind::BestScore => "best_score",
            StatKind::EventsPlayed => "events_played",
            StatKind::AveragePlacement => "average_placement",
            StatKind::LongestWinStreak => "longest_win_streak",
            StatKind::CurrentRating => "current_rating",
            StatKind::WeeklyRatingChange => "weekly_rating_change",
            StatKind::SeasonalRatingChange => "seasonal_rating_change",
        }
    }

    /// Placement is the only statistic where a smaller value ranks first.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, StatKind::AveragePlacement)
    }

    /// Rating figures come from the match source rather than a bundle.
    pub fn is_rating(&self) -> bool {
        matches!(
            self,
            StatKind::CurrentRating | StatKind::WeeklyRatingChange | StatKind::SeasonalRatingChange
        )
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        StatKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown statistic: {}", s))
    }
}

macro_rules! snake_case_from_str {
    ($ty:ty, $label:literal) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let quoted = format!("\"{}\"", s.trim().to_lowercase().replace('-', "_"));
                serde_json::from_str(&quoted).map_err(|_| format!("unknown {}: {}", $label, s))
            }
        }
    };
}

snake_case_from_str!(TimeWindow, "time window");
snake_case_from_str!(Scope, "scope");
snake_case_from_str!(QueueFilter, "queue filter");
