//! API Routes
//!
//! Configures the Axum router with all advisory service endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    advise_handler, clear_handler, health_handler, invalidate_pattern_handler,
    invalidate_user_handler, prune_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /advise` - Answer an advisory request
/// - `DELETE /cache/users/:user_id` - Drop a user's cached answers
/// - `DELETE /cache/pattern/:pattern` - Drop cached answers by key substring
/// - `DELETE /cache` - Drop every cached answer
/// - `POST /cache/prune` - Remove expired entries
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/advise", post(advise_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/users/:user_id", delete(invalidate_user_handler))
        .route("/cache/pattern/:pattern", delete(invalidate_pattern_handler))
        .route("/cache/prune", post(prune_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
