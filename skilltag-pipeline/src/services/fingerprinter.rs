//! Course-skill fingerprinting and deduplication
//!
//! Turns raw course rows into canonical [`CourseSkillRecord`]s:
//! 1. Deduplicate on (course reference, skill title), keeping the first row
//! 2. Drop rows with any missing required field
//! 3. Normalize the skill title and test it against the framework skill set
//! 4. Build the course text and SHA-256 fingerprint

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::models::{skill_key, CourseRow, CourseSkillRecord, Round, SectorRelevance};

/// Join title, description and learning outcomes into the classified text
pub fn build_course_text(title: &str, about: &str, learning_outcomes: &str) -> String {
    format!("{} |: {} | {}", title, about, learning_outcomes)
}

/// Lowercase, trim and collapse whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Hex SHA-256 of the normalized `course_text + skill_title`
///
/// Case and whitespace variants of the same logical input hash identically.
pub fn fingerprint(course_text: &str, skill_title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(&format!("{}{}", course_text, skill_title)).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Records built from one course table
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Records whose skill is in the framework scope
    pub in_sector: Vec<CourseSkillRecord>,
    /// Records whose skill is not; terminal, never classified
    pub out_of_sector: Vec<CourseSkillRecord>,
    pub duplicates_dropped: usize,
    pub incomplete_dropped: usize,
}

impl DedupOutcome {
    /// Course references that appear among the out-of-sector records
    pub fn out_of_sector_courses(&self) -> HashSet<String> {
        self.out_of_sector
            .iter()
            .map(|r| r.course_ref_id.clone())
            .collect()
    }
}

fn field(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn dedup_key(row: &CourseRow) -> (Option<String>, Option<String>) {
    (
        row.course_ref().map(str::to_string),
        row.skill_title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    )
}

/// Course-skill record builder
pub struct Deduplicator<'a> {
    skill_set: &'a HashSet<String>,
}

impl<'a> Deduplicator<'a> {
    /// `skill_set` holds normalized framework skill keys (see [`skill_key`])
    pub fn new(skill_set: &'a HashSet<String>) -> Self {
        Self { skill_set }
    }

    /// Build Round 1 records from raw rows
    pub fn build(&self, rows: &[CourseRow]) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();
        let mut seen = HashSet::new();

        for row in rows {
            if !seen.insert(dedup_key(row)) {
                outcome.duplicates_dropped += 1;
                continue;
            }
            if !row.is_complete() {
                outcome.incomplete_dropped += 1;
                continue;
            }

            let record = self.record_from(row);
            match record.sector_relevance {
                SectorRelevance::InSector => outcome.in_sector.push(record),
                SectorRelevance::OutOfSector => {
                    debug!(
                        course = %record.course_ref_id,
                        skill = %record.skill_title,
                        "Skill not in framework scope"
                    );
                    outcome.out_of_sector.push(record)
                }
            }
        }

        info!(
            in_sector = outcome.in_sector.len(),
            out_of_sector = outcome.out_of_sector.len(),
            duplicates = outcome.duplicates_dropped,
            incomplete = outcome.incomplete_dropped,
            "Built course-skill records"
        );

        outcome
    }

    fn record_from(&self, row: &CourseRow) -> CourseSkillRecord {
        let course_title = field(&row.course_title);
        let about = field(&row.about);
        let learning_outcomes = field(&row.learning_outcomes);
        let skill_title = field(&row.skill_title);
        let skill_lower = skill_key(&skill_title);
        let course_text = build_course_text(&course_title, &about, &learning_outcomes);
        let unique_id = fingerprint(&course_text, &skill_title);

        let sector_relevance = if self.skill_set.contains(&skill_lower) {
            SectorRelevance::InSector
        } else {
            SectorRelevance::OutOfSector
        };

        CourseSkillRecord {
            course_ref_id: field(&row.course_ref_id),
            skill_title,
            skill_lower,
            course_title,
            about,
            learning_outcomes,
            course_text,
            unique_id,
            sector_relevance,
            source_round: Round::R1,
        }
    }
}
