//! REST API endpoints.
//!
//! Axum-based read API over the stat cache: leaderboards, cache freshness
//! and maintenance, plus live per-player reports.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::cache::CacheError;
use crate::models::EntityId;
use crate::source::SourceError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

/// Parse an id taken from the request path.
pub fn path_id(raw: &str) -> Result<EntityId, ApiError> {
    let id = EntityId::from(raw);
    if !id.is_path_safe() {
        return Err(ApiError::BadRequest(format!("Invalid id: {:?}", raw)));
    }
    Ok(id)
}

/// CORS policy for a configured origin; `*` allows any origin.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/cache", delete(routes::cache::clear_all))
        .route(
            "/communities/:id/leaderboard",
            get(routes::leaderboard::leaderboard),
        )
        .route(
            "/communities/:id/cache",
            get(routes::cache::info).delete(routes::cache::clear),
        )
        .route("/communities/:id/refresh", post(routes::cache::refresh))
        .route(
            "/communities/:id/players/:player/report",
            get(routes::players::report),
        )
        .route(
            "/communities/:id/players/:player/versus/:opponent",
            get(routes::players::versus),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
