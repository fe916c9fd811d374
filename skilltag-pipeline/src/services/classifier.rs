//! Classification collaborator
//!
//! A [`Classifier`] turns one course-skill request into a
//! [`ClassificationResult`] or fails with a [`ClassifyError`]. Failures never
//! leave the worker pool; they become unresolved results.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{ClassificationResult, Confidence, Round};

/// Classification client errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No knowledge base entry for skill '{0}'")]
    MissingKnowledge(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// One classification call
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub unique_id: String,
    pub round: Round,
    pub skill_title: String,
    pub course_text: String,
    /// Round 1: full per-level entry; Round 2: flattened levels
    pub knowledge_excerpt: Arc<String>,
    /// Generic level rubric, Round 2 only
    pub reference_chart: Option<Arc<String>>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError>;
}

/// Response key carrying the level for each round
pub fn level_key(round: Round) -> &'static str {
    match round {
        Round::R1 => "proficiency_level",
        Round::R2 => "proficiency",
    }
}

fn parse_level_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                u8::try_from(i).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && (0.0..=255.0).contains(f))
                    .map(|f| f as u8)
            }
        }
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    }
}

/// Parse a JSON reply into a result
///
/// Accepts either level key regardless of round, integer or numeric-string
/// levels, and a missing or unknown confidence (recorded as `None`).
pub fn parse_classification(
    unique_id: &str,
    round: Round,
    content: &str,
) -> Result<ClassificationResult, ClassifyError> {
    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| ClassifyError::Parse(format!("reply is not JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ClassifyError::Parse("reply is not a JSON object".to_string()))?;

    let raw_level = obj
        .get(level_key(round))
        .or_else(|| obj.get("proficiency_level"))
        .or_else(|| obj.get("proficiency"))
        .ok_or_else(|| ClassifyError::Parse("reply has no proficiency field".to_string()))?;
    let proficiency_level = parse_level_value(raw_level)
        .ok_or_else(|| ClassifyError::Parse(format!("unusable proficiency value {}", raw_level)))?;

    let reason = obj
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let confidence = obj
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Confidence>().ok());

    Ok(ClassificationResult {
        unique_id: unique_id.to_string(),
        proficiency_level,
        reason,
        confidence,
    })
}
