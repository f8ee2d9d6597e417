use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{path_id, ApiError};
use crate::models::{CommunityId, QueueFilter, Scope, StatKind, TimeWindow};
use crate::query::{LeaderboardQuery, LeaderboardRow};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub stat: Option<String>,
    pub window: Option<String>,
    pub scope: Option<String>,
    pub queue: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub community_id: CommunityId,
    pub query: LeaderboardQuery,
    pub rows: Vec<LeaderboardRow>,
}

fn parse_param<T: FromStr<Err = String>>(value: Option<&str>, default: T) -> Result<T, ApiError> {
    match value {
        Some(raw) => raw.parse().map_err(ApiError::BadRequest),
        None => Ok(default),
    }
}

impl LeaderboardParams {
    fn to_query(&self) -> Result<LeaderboardQuery, ApiError> {
        let stat: StatKind = self
            .stat
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Missing query parameter: stat".to_string()))?
            .parse()
            .map_err(ApiError::BadRequest)?;

        Ok(LeaderboardQuery::new(stat)
            .window(parse_param(self.window.as_deref(), TimeWindow::AllTime)?)
            .scope(parse_param(self.scope.as_deref(), Scope::Global)?)
            .queue(parse_param(self.queue.as_deref(), QueueFilter::All)?))
    }
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let community = path_id(&id)?;
    let query = params.to_query()?;

    let rows = state.cache.leaderboard(&community, &query).await?;

    Ok(Json(LeaderboardResponse {
        community_id: community,
        query,
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_leaderboard_builds_absent_community() {
        let (state, source) = setup_test_state();
        let app = build_router(state);

        let (status, json) = get_json(app, "/communities/guild/leaderboard?stat=win_rate").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["community_id"], "guild");
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["display_name"], "Ann");
        assert_eq!(rows[0]["position"], 1);
        assert_eq!(rows[0]["value"], 1.0);
        assert_eq!(rows[1]["value"], 0.0);
        assert_eq!(source.profile_calls(), 2);
    }

    #[tokio::test]
    async fn test_leaderboard_with_filters() {
        let (state, _) = setup_test_state();
        let app = build_router(state);

        let (status, json) = get_json(
            app,
            "/communities/guild/leaderboard?stat=average-placement&window=all_time&scope=community&queue=solo",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["query"]["stat"], "average_placement");
        assert_eq!(json["query"]["queue"], "solo");
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows[0]["display_name"], "Ann");
        assert_eq!(rows[0]["value"], 1.0);
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_unknown_stat() {
        let (state, source) = setup_test_state();
        let app = build_router(state);

        let (status, json) = get_json(app, "/communities/guild/leaderboard?stat=kills").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(source.profile_calls(), 0);
    }

    #[tokio::test]
    async fn test_leaderboard_requires_stat() {
        let (state, _) = setup_test_state();
        let (status, _) = get_json(build_router(state), "/communities/guild/leaderboard").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_unknown_window() {
        let (state, _) = setup_test_state();
        let (status, _) = get_json(
            build_router(state),
            "/communities/guild/leaderboard?stat=win_rate&window=monthly",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
