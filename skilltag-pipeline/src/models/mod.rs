//! Data models for the tagging pipeline
//!
//! - Input rows (course table, framework table)
//! - Fingerprinted course-skill records
//! - Classification results and checkpoint state
//! - Run session state machine

pub mod checkpoint;
pub mod classification;
pub mod course;
pub mod framework;
pub mod outcome;
pub mod run_session;

pub use checkpoint::{CheckpointState, Round, CHECKPOINT_VERSION};
pub use classification::{ClassificationResult, Confidence, UNRESOLVED_LEVEL};
pub use course::{CourseRow, CourseSkillRecord, SectorRelevance, COURSE_COLUMNS};
pub use framework::{skill_key, FrameworkRow, ItemKind, FRAMEWORK_COLUMNS};
pub use outcome::{RunOutcome, RunReport, TaggedRecord};
pub use run_session::{PipelineState, RunProgress, RunSession, RunStatistics, StateTransition};
