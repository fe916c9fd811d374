//! Deterministic offline classifier
//!
//! Derives a level from the request fingerprint so dry runs exercise the
//! whole pipeline (including unresolved and out-of-range levels) without a
//! network. Same fingerprint and round always give the same answer.

use async_trait::async_trait;

use super::classifier::{ClassificationRequest, Classifier, ClassifyError};
use crate::models::{ClassificationResult, Confidence};

/// Offline classifier for `--stub-classifier`
#[derive(Debug, Clone, Default)]
pub struct StubClassifier;

impl StubClassifier {
    pub fn new() -> Self {
        Self
    }

    fn level_for(request: &ClassificationRequest) -> u8 {
        let seed: u32 = request
            .unique_id
            .bytes()
            .take(8)
            .fold(request.round.number() as u32, |acc, b| {
                acc.wrapping_mul(31).wrapping_add(b as u32)
            });
        (seed % 7) as u8
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        let level = Self::level_for(request);
        Ok(ClassificationResult {
            unique_id: request.unique_id.clone(),
            proficiency_level: level,
            reason: format!("stub level {} for {}", level, request.skill_title),
            confidence: Some(if level == 0 { Confidence::Low } else { Confidence::Medium }),
        })
    }
}
