//! Scripted classifier for orchestrator tests
//!
//! Answers from a closure and records every call (fingerprint, round, start
//! time on the tokio clock). Can cancel a token once a call count is reached
//! to simulate a stop request mid-run.

use async_trait::async_trait;
use skilltag_pipeline::models::{ClassificationResult, Confidence, Round};
use skilltag_pipeline::services::{ClassificationRequest, Classifier, ClassifyError};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type Rule = dyn Fn(&ClassificationRequest) -> Result<u8, ClassifyError> + Send + Sync;

/// One recorded classification call
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub unique_id: String,
    pub round: Round,
    pub course_title: String,
    pub had_chart: bool,
    pub started_at: Instant,
}

/// Course title portion of a request's course text
pub fn title_of(request: &ClassificationRequest) -> String {
    request
        .course_text
        .split(" |: ")
        .next()
        .unwrap_or_default()
        .to_string()
}

pub struct ScriptedClassifier {
    rule: Box<Rule>,
    calls: Mutex<Vec<CallRecord>>,
    cancel_after: Option<(usize, CancellationToken)>,
    delay: Option<Duration>,
}

impl ScriptedClassifier {
    pub fn new<F>(rule: F) -> Self
    where
        F: Fn(&ClassificationRequest) -> Result<u8, ClassifyError> + Send + Sync + 'static,
    {
        Self {
            rule: Box::new(rule),
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
            delay: None,
        }
    }

    /// Every call answers `level`
    pub fn fixed(level: u8) -> Self {
        Self::new(move |_| Ok(level))
    }

    /// Cancel `token` when the `calls`-th call starts
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    /// Sleep on the tokio clock before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_in(&self, round: Round) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|c| c.round == round)
            .collect()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(CallRecord {
                unique_id: request.unique_id.clone(),
                round: request.round,
                course_title: title_of(request),
                had_chart: request.reference_chart.is_some(),
                started_at: Instant::now(),
            });
            calls.len()
        };
        if let Some((limit, token)) = &self.cancel_after {
            if count == *limit {
                token.cancel();
            }
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let level = (self.rule)(request)?;
        Ok(ClassificationResult {
            unique_id: request.unique_id.clone(),
            proficiency_level: level,
            reason: format!("scripted level {}", level),
            confidence: Some(Confidence::High),
        })
    }
}
