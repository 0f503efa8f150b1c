//! API Handlers
//!
//! HTTP request handlers for the advisory service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::advisor::AdvisoryService;
use crate::error::ServiceError;
use crate::models::{
    AdviseResponse, AdvisoryRequest, HealthResponse, InvalidateResponse, PruneResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache-fronted advisory service
    pub service: AdvisoryService,
}

impl AppState {
    pub fn new(service: AdvisoryService) -> Self {
        Self { service }
    }
}

/// Handler for POST /advise
///
/// Answers an advisory request, from the cache when possible.
pub async fn advise_handler(
    State(state): State<AppState>,
    Json(req): Json<AdvisoryRequest>,
) -> Result<Json<AdviseResponse>, ServiceError> {
    let (result, cached) = state.service.advise(&req).await?;
    Ok(Json(AdviseResponse { cached, result }))
}

/// Handler for DELETE /cache/users/:user_id
pub async fn invalidate_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.service.invalidate_user(&user_id).await;
    info!(user_id = %user_id, removed, "Invalidated user cache");
    Json(InvalidateResponse::new(removed, format!("user {}", user_id)))
}

/// Handler for DELETE /cache/pattern/:pattern
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<InvalidateResponse>, ServiceError> {
    if pattern.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Pattern cannot be empty".to_string()));
    }

    let removed = state.service.invalidate_pattern(&pattern).await;
    Ok(Json(InvalidateResponse::new(
        removed,
        format!("pattern '{}'", pattern),
    )))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> StatusCode {
    state.service.clear().await;
    StatusCode::NO_CONTENT
}

/// Handler for POST /cache/prune
pub async fn prune_handler(State(state): State<AppState>) -> Json<PruneResponse> {
    Json(state.service.prune().await.into())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.service.stats().await;
    let enabled = state.service.cache().settings().enabled;
    Json(StatsResponse::new(&stats, enabled))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.service.is_initialized()))
}
