//! Tagged rows and final run outcome

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::checkpoint::Round;
use super::classification::{ClassificationResult, Confidence};
use super::course::{CourseRow, CourseSkillRecord, SectorRelevance};
use super::run_session::RunStatistics;

/// A course-skill record joined with its classification
///
/// Flat so it serializes directly as one CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRecord {
    #[serde(rename = "Course Reference Number")]
    pub course_ref_id: String,
    #[serde(rename = "Skill Title")]
    pub skill_title: String,
    #[serde(rename = "Course Title")]
    pub course_title: String,
    #[serde(rename = "About This Course")]
    pub about: String,
    #[serde(rename = "What You'll Learn")]
    pub learning_outcomes: String,
    pub skill_lower: String,
    pub course_text: String,
    pub unique_id: String,
    #[serde(rename = "Sector Relevance")]
    pub sector_relevance: SectorRelevance,
    pub source_round: Round,
    pub proficiency_level: u8,
    pub reason: String,
    pub confidence: Option<Confidence>,
}

impl TaggedRecord {
    pub fn new(record: &CourseSkillRecord, result: &ClassificationResult) -> Self {
        Self {
            course_ref_id: record.course_ref_id.clone(),
            skill_title: record.skill_title.clone(),
            course_title: record.course_title.clone(),
            about: record.about.clone(),
            learning_outcomes: record.learning_outcomes.clone(),
            skill_lower: record.skill_lower.clone(),
            course_text: record.course_text.clone(),
            unique_id: record.unique_id.clone(),
            sector_relevance: record.sector_relevance,
            source_round: record.source_round,
            proficiency_level: result.proficiency_level,
            reason: result.reason.clone(),
            confidence: result.confidence,
        }
    }

    /// Original course metadata, without the classification
    pub fn record(&self) -> CourseSkillRecord {
        CourseSkillRecord {
            course_ref_id: self.course_ref_id.clone(),
            skill_title: self.skill_title.clone(),
            skill_lower: self.skill_lower.clone(),
            course_title: self.course_title.clone(),
            about: self.about.clone(),
            learning_outcomes: self.learning_outcomes.clone(),
            course_text: self.course_text.clone(),
            unique_id: self.unique_id.clone(),
            sector_relevance: self.sector_relevance,
            source_round: self.source_round,
        }
    }

    /// Replace the classification with a later round's
    pub fn superseded_by(&self, later: &TaggedRecord) -> Self {
        Self {
            source_round: later.source_round,
            proficiency_level: later.proficiency_level,
            reason: later.reason.clone(),
            confidence: later.confidence,
            ..self.clone()
        }
    }

    /// Merge key shared across rounds
    pub fn key(&self) -> (&str, &str) {
        (self.course_ref_id.as_str(), self.skill_title.as_str())
    }
}

/// Final partitions and artifacts of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub sector_alias: String,
    pub valid: Vec<TaggedRecord>,
    pub invalid: Vec<TaggedRecord>,
    pub out_of_sector: Vec<CourseSkillRecord>,
    pub missing_content: Vec<CourseRow>,
    pub poor_quality: Vec<CourseRow>,
    /// Skills tagged on courses but absent from the framework
    pub unknown_skills: Vec<String>,
    pub artifacts: Vec<PathBuf>,
    pub statistics: RunStatistics,
}

impl RunReport {
    /// Union of valid and invalid rows, as written to `all_tagged_skills`
    pub fn all_tagged(&self) -> Vec<TaggedRecord> {
        self.valid.iter().chain(self.invalid.iter()).cloned().collect()
    }
}

/// How a call to the orchestrator ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Both rounds reconciled and artifacts written
    Completed(RunReport),
    /// Stop requested between batches; a checkpoint was saved for resumption
    Stopped {
        run_id: String,
        round: Round,
        pending: usize,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Stopped { .. } => None,
        }
    }
}
