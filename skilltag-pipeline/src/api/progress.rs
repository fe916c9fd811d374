//! Run status endpoint
//!
//! Serves the latest [`RunSession`] snapshot published by the orchestrator:
//! state, round progress and counters.

use axum::{extract::State, routing::get, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::models::RunSession;
use crate::AppState;

/// GET /progress
pub async fn run_progress(State(state): State<AppState>) -> ApiResult<Json<RunSession>> {
    state
        .session
        .read()
        .await
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no tagging run has started".to_string()))
}

/// Build run status routes
pub fn progress_routes() -> Router<AppState> {
    Router::new().route("/progress", get(run_progress))
}
