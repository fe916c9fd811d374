//! Classification worker pool
//!
//! Each dispatched record runs on its own tokio task. The pool hands back a
//! [`FuturesUnordered`] of outcomes that the orchestrator drains as they
//! complete; it is the only writer of the round's results. A failing call or
//! a panicking task never surfaces as an error: it is logged and recorded as
//! an unresolved result so the batch always completes.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{error, warn};

use super::classifier::{ClassificationRequest, Classifier, ClassifyError};
use super::skill_cache::SkillInfoCache;
use crate::models::{ClassificationResult, CourseSkillRecord, Round};

/// Result of one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub result: ClassificationResult,
    /// Whether the call failed and `result` is the unresolved sentinel
    pub failed: bool,
}

impl WorkerOutcome {
    fn failed(unique_id: &str) -> Self {
        Self {
            result: ClassificationResult::unresolved(unique_id),
            failed: true,
        }
    }
}

/// In-flight workers of one dispatch wave
pub type InFlight = FuturesUnordered<BoxFuture<'static, WorkerOutcome>>;

/// Dispatches classification calls for one round
pub struct WorkerPool {
    round: Round,
    classifier: Arc<dyn Classifier>,
    skill_cache: Arc<SkillInfoCache>,
    reference_chart: Option<Arc<String>>,
}

impl WorkerPool {
    /// `reference_chart` is attached to every request (Round 2 only)
    pub fn new(
        round: Round,
        classifier: Arc<dyn Classifier>,
        skill_cache: Arc<SkillInfoCache>,
        reference_chart: Option<Arc<String>>,
    ) -> Self {
        Self {
            round,
            classifier,
            skill_cache,
            reference_chart,
        }
    }

    /// Start one worker per record
    pub fn dispatch(&self, records: &[CourseSkillRecord]) -> InFlight {
        let in_flight = FuturesUnordered::new();
        for record in records {
            in_flight.push(self.spawn(record.clone()));
        }
        in_flight
    }

    fn spawn(&self, record: CourseSkillRecord) -> BoxFuture<'static, WorkerOutcome> {
        let round = self.round;
        let classifier = Arc::clone(&self.classifier);
        let cache = Arc::clone(&self.skill_cache);
        let chart = self.reference_chart.clone();
        let unique_id = record.unique_id.clone();

        let handle = tokio::spawn(async move {
            let excerpt = cache
                .get_or_build(&record.skill_lower)
                .ok_or_else(|| ClassifyError::MissingKnowledge(record.skill_lower.clone()))?;
            let request = ClassificationRequest {
                unique_id: record.unique_id.clone(),
                round,
                skill_title: record.skill_title.clone(),
                course_text: record.course_text.clone(),
                knowledge_excerpt: excerpt,
                reference_chart: chart,
            };
            classifier.classify(&request).await
        });

        async move {
            match handle.await {
                Ok(Ok(mut result)) => {
                    result.unique_id = unique_id;
                    WorkerOutcome {
                        result,
                        failed: false,
                    }
                }
                Ok(Err(e)) => {
                    warn!(
                        unique_id = %unique_id,
                        round = round.number(),
                        error = %e,
                        "Classification failed, recording as unresolved"
                    );
                    WorkerOutcome::failed(&unique_id)
                }
                Err(join_err) => {
                    error!(
                        unique_id = %unique_id,
                        round = round.number(),
                        error = %join_err,
                        "Classification task aborted, recording as unresolved"
                    );
                    WorkerOutcome::failed(&unique_id)
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameworkRow, SectorRelevance};
    use crate::services::knowledge_base::KnowledgeBase;
    use async_trait::async_trait;
    use futures::StreamExt;

    /// Fails for fingerprints starting with "bad", panics for "panic"
    struct FlakyClassifier;

    #[async_trait]
    impl Classifier for FlakyClassifier {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn classify(
            &self,
            request: &ClassificationRequest,
        ) -> Result<ClassificationResult, ClassifyError> {
            if request.unique_id.starts_with("panic") {
                panic!("classifier blew up");
            }
            if request.unique_id.starts_with("bad") {
                return Err(ClassifyError::Network("connection reset".to_string()));
            }
            Ok(ClassificationResult {
                unique_id: String::new(),
                proficiency_level: 2,
                reason: "ok".to_string(),
                confidence: None,
            })
        }
    }

    fn record(id: &str, skill: &str) -> CourseSkillRecord {
        CourseSkillRecord {
            course_ref_id: format!("C-{}", id),
            skill_title: skill.to_string(),
            skill_lower: skill.to_lowercase(),
            course_title: "T".to_string(),
            about: "A".to_string(),
            learning_outcomes: "W".to_string(),
            course_text: "T |: A | W".to_string(),
            unique_id: id.to_string(),
            sector_relevance: SectorRelevance::InSector,
            source_round: Round::R1,
        }
    }

    fn pool() -> WorkerPool {
        let rows = vec![FrameworkRow {
            skill_title: "Data Analysis".to_string(),
            sector: "HR".to_string(),
            proficiency_level: 2,
            proficiency_description: None,
            classification: Some("Knowledge".to_string()),
            item: Some("Statistics".to_string()),
        }];
        let kb = Arc::new(KnowledgeBase::build(&rows, &[]));
        WorkerPool::new(
            Round::R1,
            Arc::new(FlakyClassifier),
            Arc::new(SkillInfoCache::new(Round::R1, kb)),
            None,
        )
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let records = vec![
            record("good-1", "Data Analysis"),
            record("bad-1", "Data Analysis"),
            record("panic-1", "Data Analysis"),
            record("good-2", "Welding"),
        ];
        let outcomes: Vec<WorkerOutcome> = pool().dispatch(&records).collect().await;
        assert_eq!(outcomes.len(), 4);

        let find = |id: &str| outcomes.iter().find(|o| o.result.unique_id == id).unwrap();
        assert!(!find("good-1").failed);
        assert_eq!(find("good-1").result.proficiency_level, 2);
        assert!(find("bad-1").failed);
        assert_eq!(find("bad-1").result, ClassificationResult::unresolved("bad-1"));
        assert!(find("panic-1").failed);
        // no knowledge base entry for the skill
        assert!(find("good-2").failed);
    }
}
