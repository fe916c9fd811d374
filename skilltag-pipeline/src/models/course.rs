//! Course table rows and fingerprinted course-skill records

use serde::{Deserialize, Serialize};

use super::checkpoint::Round;

/// Exact column names of the course table
pub const COURSE_COLUMNS: [&str; 5] = [
    "Course Reference Number",
    "Skill Title",
    "Course Title",
    "About This Course",
    "What You'll Learn",
];

/// One raw row of the course table
///
/// Every field is optional so incomplete rows can be read and audited
/// instead of failing the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRow {
    #[serde(rename = "Course Reference Number")]
    pub course_ref_id: Option<String>,
    #[serde(rename = "Skill Title")]
    pub skill_title: Option<String>,
    #[serde(rename = "Course Title")]
    pub course_title: Option<String>,
    #[serde(rename = "About This Course")]
    pub about: Option<String>,
    #[serde(rename = "What You'll Learn")]
    pub learning_outcomes: Option<String>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

impl CourseRow {
    /// All required fields carry non-blank text
    pub fn is_complete(&self) -> bool {
        present(&self.course_ref_id)
            && present(&self.skill_title)
            && present(&self.course_title)
            && present(&self.about)
            && present(&self.learning_outcomes)
    }

    /// Course title absent or blank
    pub fn missing_title(&self) -> bool {
        !present(&self.course_title)
    }

    /// Trimmed course reference, if any
    pub fn course_ref(&self) -> Option<&str> {
        self.course_ref_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Whether a record's skill belongs to the framework scope being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorRelevance {
    #[serde(rename = "In Sector")]
    InSector,
    #[serde(rename = "Not in sector")]
    OutOfSector,
}

impl SectorRelevance {
    pub fn label(self) -> &'static str {
        match self {
            SectorRelevance::InSector => "In Sector",
            SectorRelevance::OutOfSector => "Not in sector",
        }
    }
}

/// Canonical (course, skill) pair built once per run from deduplicated input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSkillRecord {
    pub course_ref_id: String,
    pub skill_title: String,
    /// Trimmed, lowercased skill title used for every framework lookup
    pub skill_lower: String,
    pub course_title: String,
    pub about: String,
    pub learning_outcomes: String,
    /// Title, description and learning outcomes joined with pipes
    pub course_text: String,
    /// SHA-256 fingerprint of `course_text + skill_title`
    pub unique_id: String,
    pub sector_relevance: SectorRelevance,
    pub source_round: Round,
}

impl CourseSkillRecord {
    /// Copy of this record tagged as a Round 2 work item
    pub fn for_round(&self, round: Round) -> Self {
        Self {
            source_round: round,
            ..self.clone()
        }
    }
}
