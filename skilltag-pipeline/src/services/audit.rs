//! Audit partitioning of courses that never reached a tagged state
//!
//! Runs after the final merge. A course (by reference number) that appears in
//! the raw course table but in neither the merged valid ∪ invalid set nor
//! the out-of-sector output is poor data quality. The split is per course:
//! if any of its raw rows has no course title, all of its rows go to
//! `missing_content`, otherwise they go to `poor_quality`. Rows without a
//! reference number are judged on their own.

use std::collections::HashSet;
use tracing::info;

use crate::models::{CourseRow, TaggedRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutcome {
    pub missing_content: Vec<CourseRow>,
    pub poor_quality: Vec<CourseRow>,
}

pub fn partition(
    raw_rows: &[CourseRow],
    tagged: &[TaggedRecord],
    out_of_sector_courses: &HashSet<String>,
) -> AuditOutcome {
    let accounted: HashSet<&str> = tagged
        .iter()
        .map(|r| r.course_ref_id.as_str())
        .chain(out_of_sector_courses.iter().map(String::as_str))
        .collect();

    let unaccounted: Vec<&CourseRow> = raw_rows
        .iter()
        .filter(|row| !row.course_ref().is_some_and(|id| accounted.contains(id)))
        .collect();

    let untitled_courses: HashSet<&str> = unaccounted
        .iter()
        .filter(|row| row.missing_title())
        .filter_map(|row| row.course_ref())
        .collect();

    let mut outcome = AuditOutcome::default();
    for row in unaccounted {
        let missing = match row.course_ref() {
            Some(id) => untitled_courses.contains(id),
            None => row.missing_title(),
        };
        if missing {
            outcome.missing_content.push(row.clone());
        } else {
            outcome.poor_quality.push(row.clone());
        }
    }

    info!(
        missing_content = outcome.missing_content.len(),
        poor_quality = outcome.poor_quality.len(),
        "Audit partition complete"
    );
    outcome
}
