//! Live per-player statistics, computed from the match source on request.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::{path_id, ApiError};
use crate::calculate::{head_to_head, HeadToHead, PlayerReport};
use crate::models::PlayerId;

#[derive(Debug, Serialize)]
pub struct VersusResponse {
    pub player_id: PlayerId,
    pub opponent_id: PlayerId,
    pub meetings: u32,
    #[serde(flatten)]
    pub record: HeadToHead,
}

pub async fn report(
    State(state): State<AppState>,
    Path((id, player)): Path<(String, String)>,
) -> Result<Json<PlayerReport>, ApiError> {
    let community = path_id(&id)?;
    let player = path_id(&player)?;

    if state.source.profile(&player).await?.is_none() {
        return Err(ApiError::NotFound(format!("Unknown player {}", player)));
    }

    let matches = state.source.all_matches(&player, &community).await?;
    Ok(Json(PlayerReport::compute(&matches, &player)))
}

pub async fn versus(
    State(state): State<AppState>,
    Path((id, player, opponent)): Path<(String, String, String)>,
) -> Result<Json<VersusResponse>, ApiError> {
    let community = path_id(&id)?;
    let player = path_id(&player)?;
    let opponent = path_id(&opponent)?;

    let matches = state.source.all_matches(&player, &community).await?;
    let record = head_to_head(&matches, &player, &opponent);

    Ok(Json(VersusResponse {
        player_id: player,
        opponent_id: opponent,
        meetings: record.meetings(),
        record,
    }))
}
