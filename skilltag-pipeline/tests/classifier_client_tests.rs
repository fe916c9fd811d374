//! Live classification client against a mock chat-completions server

use serde_json::json;
use skilltag_pipeline::config::ClassifierSettings;
use skilltag_pipeline::models::{Confidence, Round};
use skilltag_pipeline::services::{
    ClassificationRequest, Classifier, ClassifyError, LlmClassifier,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> ClassifierSettings {
    ClassifierSettings {
        base_url: format!("{}/v1", server.uri()),
        model: "gpt-4o".to_string(),
        temperature: 0.1,
        seed: 6800,
        timeout: Duration::from_secs(5),
        requests_per_second: 100,
        api_key: "test-key".to_string(),
    }
}

fn request(round: Round) -> ClassificationRequest {
    ClassificationRequest {
        unique_id: "fp-1".to_string(),
        round,
        skill_title: "Data Analysis".to_string(),
        course_text: "Intro to Data |: Basics | Charts".to_string(),
        knowledge_excerpt: Arc::new("Level 2: Analyse data".to_string()),
        reference_chart: match round {
            Round::R1 => None,
            Round::R2 => Some(Arc::new("Level 1: Follow".to_string())),
        },
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_round_one_reply_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "seed": 6800,
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"proficiency_level": 2, "reason": "covers analysis", "confidence": "high"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlmClassifier::new(settings(&server)).unwrap();
    let result = client.classify(&request(Round::R1)).await.unwrap();

    assert_eq!(result.unique_id, "fp-1");
    assert_eq!(result.proficiency_level, 2);
    assert_eq!(result.reason, "covers analysis");
    assert_eq!(result.confidence, Some(Confidence::High));
}

#[tokio::test]
async fn test_round_two_uses_proficiency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"proficiency": "3", "reason": "applied work"}"#,
        )))
        .mount(&server)
        .await;

    let client = LlmClassifier::new(settings(&server)).unwrap();
    let result = client.classify(&request(Round::R2)).await.unwrap();

    assert_eq!(result.proficiency_level, 3);
    assert_eq!(result.confidence, None);
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = LlmClassifier::new(settings(&server)).unwrap();
    match client.classify(&request(Round::R1)).await {
        Err(ClassifyError::Api(500, body)) => assert_eq!(body, "overloaded"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_content_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Level two, probably.")),
        )
        .mount(&server)
        .await;

    let client = LlmClassifier::new(settings(&server)).unwrap();
    assert!(matches!(
        client.classify(&request(Round::R1)).await,
        Err(ClassifyError::Parse(_))
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let server = MockServer::start().await;
    let settings = settings(&server);
    drop(server);

    let client = LlmClassifier::new(settings).unwrap();
    assert!(matches!(
        client.classify(&request(Round::R1)).await,
        Err(ClassifyError::Network(_))
    ));
}
