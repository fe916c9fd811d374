//! Phase 3: COMPLETE
//!
//! Round 2 output is terminal. Round 1 valid rows are merged with Round 2
//! valid rows on (course reference, skill title), Round 2 winning on a
//! collision. Whatever Round 2 left invalid stays invalid. Courses that never
//! reached a tagged or out-of-sector state are audited, every artifact is
//! written and the checkpoint is removed.

use chrono::Utc;
use skilltag_common::events::TaggingEvent;
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::{RunInputs, WorkflowOrchestrator};
use crate::error::PipelineResult;
use crate::models::{
    CheckpointState, CourseSkillRecord, PipelineState, RunReport, RunSession, TaggedRecord,
};
use crate::services::{audit, ReconciliationReport};
use crate::tables::Artifact;

/// Merge later-round valid rows over carried ones
fn merge_valid(carried: &[TaggedRecord], later: &[TaggedRecord]) -> Vec<TaggedRecord> {
    let mut merged: Vec<TaggedRecord> = carried.to_vec();
    let mut index: HashMap<(String, String), usize> = merged
        .iter()
        .enumerate()
        .map(|(i, row)| ((row.course_ref_id.clone(), row.skill_title.clone()), i))
        .collect();

    for row in later {
        let key = (row.course_ref_id.clone(), row.skill_title.clone());
        match index.get(&key) {
            Some(&i) => merged[i] = merged[i].superseded_by(row),
            None => {
                index.insert(key, merged.len());
                merged.push(row.clone());
            }
        }
    }
    merged
}

impl WorkflowOrchestrator {
    pub(super) async fn phase_finalize(
        &self,
        inputs: &RunInputs,
        state: CheckpointState,
        report: ReconciliationReport,
        out_of_sector: Vec<CourseSkillRecord>,
        session: &mut RunSession,
        start_time: std::time::Instant,
    ) -> PipelineResult<RunReport> {
        let valid = merge_valid(&state.carried_valid, &report.valid);
        let valid_keys: HashSet<(String, String)> = valid
            .iter()
            .map(|row| (row.course_ref_id.clone(), row.skill_title.clone()))
            .collect();
        let invalid: Vec<TaggedRecord> = report
            .invalid
            .into_iter()
            .filter(|row| !valid_keys.contains(&(row.course_ref_id.clone(), row.skill_title.clone())))
            .collect();

        let out_of_sector_courses: HashSet<String> = out_of_sector
            .iter()
            .map(|r| r.course_ref_id.clone())
            .collect();

        let mut run_report = RunReport {
            run_id: state.run_id.clone(),
            sector_alias: state.sector_alias.clone(),
            valid,
            invalid,
            out_of_sector,
            unknown_skills: report.unknown_skills,
            ..Default::default()
        };

        let tagged = run_report.all_tagged();
        let audited = audit::partition(&inputs.courses, &tagged, &out_of_sector_courses);
        run_report.missing_content = audited.missing_content;
        run_report.poor_quality = audited.poor_quality;

        let writer = self.artifact_writer(&state);
        let artifacts = vec![
            writer.write(Artifact::ValidSkills, &run_report.valid).await?,
            writer.write(Artifact::InvalidSkills, &run_report.invalid).await?,
            writer.write(Artifact::AllTaggedSkills, &tagged).await?,
            writer
                .write(Artifact::OutOfSectorSkills, &run_report.out_of_sector)
                .await?,
            writer
                .write(Artifact::MissingContentCourses, &run_report.missing_content)
                .await?,
            writer
                .write(Artifact::PoorQualityCourses, &run_report.poor_quality)
                .await?,
        ];
        run_report.artifacts = artifacts;

        self.checkpoints.remove(&state).await?;

        session.transition_to(PipelineState::Complete);
        self.publish(session).await;
        run_report.statistics = session.statistics.clone();

        let duration_seconds = start_time.elapsed().as_secs();
        info!(
            run_id = %run_report.run_id,
            valid = run_report.valid.len(),
            invalid = run_report.invalid.len(),
            out_of_sector = run_report.out_of_sector.len(),
            missing_content = run_report.missing_content.len(),
            poor_quality = run_report.poor_quality.len(),
            calls = session.statistics.calls_issued,
            duration_seconds,
            "Tagging run completed"
        );

        self.event_bus.emit_lossy(TaggingEvent::RunCompleted {
            run_id: run_report.run_id.clone(),
            valid: run_report.valid.len(),
            invalid: run_report.invalid.len(),
            duration_seconds,
            timestamp: Utc::now(),
        });

        Ok(run_report)
    }
}
