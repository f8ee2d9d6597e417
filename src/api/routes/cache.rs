use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::{path_id, ApiError};
use crate::cache::{CacheInfo, RefreshOutcome};

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearAllResponse {
    pub cleared: usize,
}

pub async fn info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CacheInfo>, ApiError> {
    let community = path_id(&id)?;
    state
        .cache
        .cache_info(&community)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No cache for community {}", community)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let community = path_id(&id)?;
    Ok(Json(state.cache.refresh_cache(&community).await?))
}

pub async fn clear(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let community = path_id(&id)?;
    let cleared = state.cache.clear_cache(&community).await;
    Ok(Json(ClearResponse { cleared }))
}

pub async fn clear_all(State(state): State<AppState>) -> Json<ClearAllResponse> {
    Json(ClearAllResponse {
        cleared: state.cache.clear_all_caches().await,
    })
}
