//! Match source client.
//!
//! The cache reads profiles, match history and rating figures through the
//! [`MatchSource`] trait. [`HttpMatchSource`] talks to the upstream REST API
//! and spaces its requests to stay under the upstream rate limit.

mod http;

pub use http::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CommunityId, MatchMap, PlayerId, Profile, RatingWindow};

/// Errors returned by the match source (upstream unavailable).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to the external match history.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Player profile, or `None` when the player is unknown upstream.
    async fn profile(&self, player: &PlayerId) -> Result<Option<Profile>, SourceError>;

    /// Every match the player took part in, keyed by match id.
    ///
    /// The community is passed through so the source can tag community
    /// matches; results are not limited to it.
    async fn all_matches(
        &self,
        player: &PlayerId,
        community: &CommunityId,
    ) -> Result<MatchMap, SourceError>;

    async fn current_rating(&self, player: &PlayerId) -> Result<f64, SourceError>;

    async fn rating_delta(
        &self,
        player: &PlayerId,
        window: RatingWindow,
    ) -> Result<f64, SourceError>;
}
