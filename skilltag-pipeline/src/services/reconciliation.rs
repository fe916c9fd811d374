//! Reconciliation of assigned levels against the framework
//!
//! For one round:
//! 1. Join every record with its result by fingerprint
//! 2. Route level 0 (unresolved) straight to invalid
//! 3. Group the remaining assignments by skill and compute each skill's
//!    violating levels (assigned levels outside the framework's valid set)
//! 4. Split rows on (skill, level): a row is valid iff its level is not a
//!    violation for its skill
//!
//! Every record lands in exactly one of valid/invalid. A skill absent from
//! the framework has an empty valid set, so all of its rows are invalid.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use super::knowledge_base::KnowledgeBase;
use crate::models::{ClassificationResult, CourseSkillRecord, Round, TaggedRecord};

/// Partition of one round's records
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    pub round: Option<Round>,
    pub valid: Vec<TaggedRecord>,
    /// Violations and unresolved rows
    pub invalid: Vec<TaggedRecord>,
    /// How many of `invalid` are unresolved (level 0)
    pub untagged: usize,
    /// Skill → assigned levels outside its valid set
    pub violations: BTreeMap<String, BTreeSet<u8>>,
    /// Tagged skills with no framework entry
    pub unknown_skills: Vec<String>,
}

impl ReconciliationReport {
    /// Records to send to the next round (invalid ∪ untagged), course metadata re-attached
    pub fn forward_records(&self, next: Round) -> Vec<CourseSkillRecord> {
        self.invalid
            .iter()
            .map(|row| row.record().for_round(next))
            .collect()
    }
}

/// Reconcile a completed round
pub fn reconcile(
    round: Round,
    records: &[CourseSkillRecord],
    results: &[ClassificationResult],
    knowledge_base: &KnowledgeBase,
) -> ReconciliationReport {
    let by_id: HashMap<&str, &ClassificationResult> =
        results.iter().map(|r| (r.unique_id.as_str(), r)).collect();

    let tagged: Vec<TaggedRecord> = records
        .iter()
        .map(|record| match by_id.get(record.unique_id.as_str()) {
            Some(result) => TaggedRecord::new(record, result),
            None => {
                warn!(
                    unique_id = %record.unique_id,
                    round = round.number(),
                    "No result for record, treating as unresolved"
                );
                TaggedRecord::new(record, &ClassificationResult::unresolved(&record.unique_id))
            }
        })
        .collect();

    // Assigned level sets per skill, unresolved rows excluded
    let mut assigned: BTreeMap<&str, BTreeSet<u8>> = BTreeMap::new();
    for row in tagged.iter().filter(|r| r.proficiency_level != 0) {
        assigned
            .entry(row.skill_lower.as_str())
            .or_default()
            .insert(row.proficiency_level);
    }

    let mut violations: BTreeMap<String, BTreeSet<u8>> = BTreeMap::new();
    let mut unknown_skills = Vec::new();
    for (skill, levels) in &assigned {
        if !knowledge_base.contains(skill) {
            unknown_skills.push(skill.to_string());
        }
        let valid = knowledge_base.valid_levels(skill);
        let bad: BTreeSet<u8> = levels.difference(&valid).copied().collect();
        if !bad.is_empty() {
            debug!(skill = %skill, levels = ?bad, "Assigned levels outside valid set");
            violations.insert(skill.to_string(), bad);
        }
    }

    if !unknown_skills.is_empty() {
        warn!(
            round = round.number(),
            skills = ?unknown_skills,
            "Skills missing from framework, all their rows are invalid"
        );
    }

    let mut report = ReconciliationReport {
        round: Some(round),
        violations,
        unknown_skills,
        ..Default::default()
    };

    for row in tagged {
        if row.proficiency_level == 0 {
            report.untagged += 1;
            report.invalid.push(row);
            continue;
        }
        let is_violation = report
            .violations
            .get(&row.skill_lower)
            .map(|bad| bad.contains(&row.proficiency_level))
            .unwrap_or(false);
        if is_violation {
            report.invalid.push(row);
        } else {
            report.valid.push(row);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameworkRow, SectorRelevance};

    fn kb() -> KnowledgeBase {
        let rows: Vec<FrameworkRow> = [1u8, 2, 3]
            .iter()
            .map(|level| FrameworkRow {
                skill_title: "Data Analysis".to_string(),
                sector: "HR".to_string(),
                proficiency_level: *level,
                proficiency_description: None,
                classification: Some("Knowledge".to_string()),
                item: Some(format!("item {}", level)),
            })
            .collect();
        KnowledgeBase::build(&rows, &[])
    }

    fn record(id: &str, skill: &str) -> CourseSkillRecord {
        CourseSkillRecord {
            course_ref_id: format!("C-{}", id),
            skill_title: skill.to_string(),
            skill_lower: skill.trim().to_lowercase(),
            course_title: "T".to_string(),
            about: "A".to_string(),
            learning_outcomes: "W".to_string(),
            course_text: "T |: A | W".to_string(),
            unique_id: id.to_string(),
            sector_relevance: SectorRelevance::InSector,
            source_round: Round::R1,
        }
    }

    fn result(id: &str, level: u8) -> ClassificationResult {
        ClassificationResult {
            unique_id: id.to_string(),
            proficiency_level: level,
            reason: "r".to_string(),
            confidence: None,
        }
    }

    fn ids(rows: &[TaggedRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.unique_id.as_str()).collect()
    }

    #[test]
    fn test_valid_and_out_of_range_levels() {
        let records = vec![record("a", "Data Analysis"), record("b", "Data Analysis")];
        let results = vec![result("a", 2), result("b", 4)];
        let report = reconcile(Round::R1, &records, &results, &kb());

        assert_eq!(ids(&report.valid), vec!["a"]);
        assert_eq!(ids(&report.invalid), vec!["b"]);
        assert_eq!(report.violations["data analysis"], BTreeSet::from([4]));
        assert_eq!(report.untagged, 0);
    }

    #[test]
    fn test_level_zero_is_always_invalid() {
        let records = vec![record("a", "Data Analysis")];
        let report = reconcile(Round::R1, &records, &[result("a", 0)], &kb());
        assert!(report.valid.is_empty());
        assert_eq!(report.untagged, 1);
        assert!(report.violations.is_empty());

        let forwarded = report.forward_records(Round::R2);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].source_round, Round::R2);
    }

    #[test]
    fn test_unknown_skill_routes_everything_to_invalid() {
        let records = vec![record("a", "Basket Weaving"), record("b", "Basket Weaving")];
        let results = vec![result("a", 1), result("b", 2)];
        let report = reconcile(Round::R1, &records, &results, &kb());
        assert!(report.valid.is_empty());
        assert_eq!(report.invalid.len(), 2);
        assert_eq!(report.unknown_skills, vec!["basket weaving"]);
    }

    #[test]
    fn test_every_record_lands_in_one_bucket() {
        let records: Vec<CourseSkillRecord> = (0..20)
            .map(|i| record(&format!("id{}", i), if i % 3 == 0 { "Welding" } else { "Data Analysis" }))
            .collect();
        let results: Vec<ClassificationResult> = (0..20)
            .map(|i| result(&format!("id{}", i), (i % 6) as u8))
            .collect();
        let report = reconcile(Round::R1, &records, &results, &kb());
        assert_eq!(report.valid.len() + report.invalid.len(), records.len());

        let valid_levels = kb().valid_levels("data analysis");
        for row in &report.valid {
            assert!(valid_levels.contains(&row.proficiency_level));
        }
        for row in &report.invalid {
            assert!(
                row.skill_lower != "data analysis" || !valid_levels.contains(&row.proficiency_level)
            );
        }
    }

    #[test]
    fn test_shared_fingerprint_applies_to_all_records() {
        let mut twin = record("a", "Data Analysis");
        twin.course_ref_id = "C-twin".to_string();
        let records = vec![record("a", "Data Analysis"), twin];
        let report = reconcile(Round::R1, &records, &[result("a", 3)], &kb());
        assert_eq!(report.valid.len(), 2);
    }
}
