//! Status API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::*;
use http_body_util::BodyExt;
use skilltag_common::events::EventBus;
use skilltag_pipeline::api::health::HealthResponse;
use skilltag_pipeline::models::{PipelineState, Round, RunSession};
use skilltag_pipeline::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = AppState::new(EventBus::new(16));
    *state.last_error.write().await = Some("checkpoint write failed".to_string());
    let app = skilltag_pipeline::build_router(state);

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.module, "skilltag-pipeline");
    assert_eq!(health.last_error.as_deref(), Some("checkpoint write failed"));
    assert!(health.run.is_none());
}

#[tokio::test]
async fn test_health_reports_failed_run() {
    let state = AppState::new(EventBus::new(16));
    let mut session = RunSession::new("20240101_090000", "hr");
    session.update_progress(Round::R2, 3, 4);
    session.transition_to(PipelineState::Failed);
    *state.session.write().await = Some(session);

    let (status, body) = get(skilltag_pipeline::build_router(state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "failed");
    let run = health.run.unwrap();
    assert_eq!(run.run_id, "20240101_090000");
    assert_eq!(run.state, PipelineState::Failed);
    assert_eq!(run.round, Some(2));
    assert_eq!(run.percentage, 75.0);
}

#[tokio::test]
async fn test_progress_before_any_run_is_not_found() {
    let app = skilltag_pipeline::build_router(AppState::new(EventBus::new(16)));

    let (status, body) = get(app, "/progress").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_progress_reflects_finished_run() {
    let dirs = TestDirs::new();
    let state = AppState::new(EventBus::new(1024));
    let orchestrator = orchestrator(
        Arc::new(ScriptedClassifier::fixed(2)),
        &dirs,
        fast_settings(),
        state.event_bus.clone(),
    )
    .with_session_handle(state.session.clone());

    orchestrator
        .execute(
            inputs(framework("Data Analysis", "HR", &[1, 2, 3]), courses(5, "Data Analysis")),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let (status, body) = get(skilltag_pipeline::build_router(state.clone()), "/progress").await;
    assert_eq!(status, StatusCode::OK);
    let session: RunSession = serde_json::from_value(body).unwrap();
    assert_eq!(session.state, PipelineState::Complete);
    assert_eq!(session.sector_alias, "hr");
    assert_eq!(session.statistics.r1_valid, 5);

    let (_, body) = get(skilltag_pipeline::build_router(state), "/health").await;
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.run.unwrap().state, PipelineState::Complete);
}

#[tokio::test]
async fn test_event_stream_is_sse() {
    let app = skilltag_pipeline::build_router(AppState::new(EventBus::new(16)));
    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
}
