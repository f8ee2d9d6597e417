//! Competitive seasons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MatchRecord;

/// Season number the match source uses for records it could not assign.
pub const UNASSIGNED_SEASON: u32 = 0;

/// The current season: the single source of truth for seasonal windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    /// Season number as reported on match records
    pub number: u32,

    /// When the season opened
    pub started_at: DateTime<Utc>,
}

impl Season {
    pub fn new(number: u32, started_at: DateTime<Utc>) -> Self {
        Self { number, started_at }
    }

    /// Whether a match counts towards this season.
    ///
    /// The record's own season number is authoritative. Records without one
    /// fall back to the season start date.
    pub fn contains(&self, record: &MatchRecord) -> bool {
        if record.season == UNASSIGNED_SEASON {
            record.timestamp >= self.started_at
        } else {
            record.season == self.number
        }
    }
}

impl Default for Season {
    fn default() -> Self {
        Self {
            number: 1,
            started_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
