//! Health check endpoint
//!
//! Reports liveness plus a one-line view of the tagging run, so a monitor can
//! tell a stuck or failed run apart from a healthy one without polling
//! `/progress`.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{PipelineState, RunSession};
use crate::AppState;

/// Snapshot of the current (or last) tagging run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHealth {
    pub run_id: String,
    pub sector_alias: String,
    pub state: PipelineState,
    pub resumed: bool,
    /// Current round, 1 or 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u8>,
    /// Round completion, 0.0 - 100.0
    pub percentage: f64,
}

impl From<&RunSession> for RunHealth {
    fn from(session: &RunSession) -> Self {
        Self {
            run_id: session.run_id.clone(),
            sector_alias: session.sector_alias.clone(),
            state: session.state,
            resumed: session.resumed,
            round: session.progress.round.map(|r| r.number()),
            percentage: session.progress.percentage,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok", or "failed" when the run ended in FAILED
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Absent until the orchestrator publishes its first session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let run = state.session.read().await.as_ref().map(RunHealth::from);
    let status = match run.as_ref().map(|r| r.state) {
        Some(PipelineState::Failed) => "failed",
        _ => "ok",
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "skilltag-pipeline".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        run,
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
