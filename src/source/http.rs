//! REST implementation of [`MatchSource`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use super::{MatchSource, SourceError};
use crate::calculate::match_map;
use crate::models::{CommunityId, MatchMap, MatchRecord, PlayerId, Profile, RatingWindow};

/// Configuration for the HTTP match source.
#[derive(Debug, Clone)]
pub struct MatchSourceConfig {
    /// API root, e.g. `https://stats.example.com/api/v1`
    pub base_url: Url,

    /// Request timeout
    pub timeout: Duration,

    /// Sent as a bearer token when present
    pub api_token: Option<String>,

    /// Minimum spacing between requests
    pub request_delay: Duration,

    pub user_agent: String,
}

impl MatchSourceConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            api_token: None,
            request_delay: Duration::from_millis(250),
            user_agent: format!("ladder-stats/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Spaces calls so consecutive requests start at least `delay` apart.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Wait for the next request slot.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.delay;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Deserialize)]
struct RatingBody {
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct DeltaBody {
    delta: f64,
}

/// Match source backed by the upstream REST API.
pub struct HttpMatchSource {
    client: Client,
    config: MatchSourceConfig,
    throttle: Throttle,
}

impl HttpMatchSource {
    pub fn new(config: MatchSourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("ladder-stats")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            throttle: Throttle::new(config.request_delay),
            config,
        })
    }

    /// `{base}/players/{player}/{rest...}`
    fn player_url(&self, player: &PlayerId, rest: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .push("players")
            .push(player.as_str())
            .extend(rest);
        Ok(url)
    }

    async fn send(&self, url: &Url) -> Result<Response, SourceError> {
        self.throttle.wait().await;
        debug!("GET {}", url);

        let mut request = self.client.get(url.as_str());
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(SourceError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let response = self.send(&url).await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl MatchSource for HttpMatchSource {
    async fn profile(&self, player: &PlayerId) -> Result<Option<Profile>, SourceError> {
        let url = self.player_url(player, &[])?;
        let response = self.send(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::read_json(response).await?))
    }

    async fn all_matches(
        &self,
        player: &PlayerId,
        community: &CommunityId,
    ) -> Result<MatchMap, SourceError> {
        let mut url = self.player_url(player, &["matches"])?;
        url.query_pairs_mut()
            .append_pair("community", community.as_str());

        let records: Vec<MatchRecord> = self.get_json(url).await?;
        Ok(match_map(records))
    }

    async fn current_rating(&self, player: &PlayerId) -> Result<f64, SourceError> {
        let url = self.player_url(player, &["rating"])?;
        let body: RatingBody = self.get_json(url).await?;
        Ok(body.rating)
    }

    async fn rating_delta(
        &self,
        player: &PlayerId,
        window: RatingWindow,
    ) -> Result<f64, SourceError> {
        let mut url = self.player_url(player, &["rating", "delta"])?;
        url.query_pairs_mut()
            .append_pair("window", &window.to_string());

        let body: DeltaBody = self.get_json(url).await?;
        Ok(body.delta)
    }
}
