//! Service modules for the tagging pipeline
//!
//! Leaves first:
//! - Fingerprinting and deduplication of course rows
//! - Knowledge base and reference chart
//! - Classifier clients (live, stub)
//! - Worker pool, cooldown limiter, excerpt cache
//! - Reconciliation and audit partitioning
//! - The workflow orchestrator driving both rounds

pub mod audit;
pub mod classifier;
pub mod fingerprinter;
pub mod knowledge_base;
pub mod llm_client;
pub mod rate_limiter;
pub mod reconciliation;
pub mod reference_chart;
pub mod skill_cache;
pub mod stub_classifier;
pub mod worker_pool;
pub mod workflow_orchestrator;

pub use audit::AuditOutcome;
pub use classifier::{ClassificationRequest, Classifier, ClassifyError};
pub use fingerprinter::{build_course_text, fingerprint, DedupOutcome, Deduplicator};
pub use knowledge_base::{FlatLevel, KnowledgeBase, LevelKnowledge, SkillKnowledge};
pub use llm_client::LlmClassifier;
pub use rate_limiter::CooldownLimiter;
pub use reconciliation::{reconcile, ReconciliationReport};
pub use skill_cache::SkillInfoCache;
pub use stub_classifier::StubClassifier;
pub use worker_pool::{InFlight, WorkerOutcome, WorkerPool};
pub use workflow_orchestrator::{RunInputs, SessionHandle, WorkflowOrchestrator};
