//! ROUND1_RECONCILED / ROUND2_RECONCILED
//!
//! Validates a finished round against the framework. After Round 1 the
//! valid rows are written out and carried forward, and the invalid and
//! unresolved rows become the Round 2 work set.

use chrono::Utc;
use skilltag_common::events::TaggingEvent;
use tracing::info;

use super::WorkflowOrchestrator;
use crate::error::PipelineResult;
use crate::models::{CheckpointState, PipelineState, Round, RunSession};
use crate::services::{reconcile, KnowledgeBase, ReconciliationReport};
use crate::tables::Artifact;

impl WorkflowOrchestrator {
    pub(super) async fn phase_reconcile(
        &self,
        state: &CheckpointState,
        session: &mut RunSession,
        knowledge_base: &KnowledgeBase,
    ) -> ReconciliationReport {
        let round = state.round;
        let report = reconcile(round, &state.records, &state.results, knowledge_base);

        match round {
            Round::R1 => {
                session.statistics.r1_valid = report.valid.len();
                session.statistics.r1_invalid = report.invalid.len();
            }
            Round::R2 => {
                session.statistics.r2_valid = report.valid.len();
                session.statistics.r2_invalid = report.invalid.len();
            }
        }
        session.transition_to(PipelineState::reconciled(round));
        self.publish(session).await;

        info!(
            run_id = %state.run_id,
            round = round.number(),
            valid = report.valid.len(),
            invalid = report.invalid.len(),
            untagged = report.untagged,
            violating_skills = report.violations.len(),
            "Round reconciled"
        );

        self.event_bus.emit_lossy(TaggingEvent::RoundReconciled {
            run_id: state.run_id.clone(),
            round: round.number(),
            valid: report.valid.len(),
            invalid: report.invalid.len(),
            untagged: report.untagged,
            timestamp: Utc::now(),
        });

        report
    }

    /// Write Round 1 partitions and start `next` on the forwarded rows
    pub(super) async fn phase_advance(
        &self,
        state: CheckpointState,
        report: &ReconciliationReport,
        next: Round,
        session: &mut RunSession,
    ) -> PipelineResult<CheckpointState> {
        // Only Round 1 has a successor
        let writer = self.artifact_writer(&state);
        writer.write(Artifact::R1Valid, &report.valid).await?;
        writer.write(Artifact::R1Invalid, &report.invalid).await?;

        let mut carried_valid = state.carried_valid;
        carried_valid.extend(report.valid.iter().cloned());

        let forwarded = report.forward_records(next);
        info!(
            run_id = %state.run_id,
            round = next.number(),
            forwarded = forwarded.len(),
            carried_valid = carried_valid.len(),
            "Forwarding invalid and unresolved rows"
        );

        let mut next_state = CheckpointState::start_round(
            state.run_id,
            state.sector_alias,
            next,
            forwarded,
            carried_valid,
        );
        self.save_checkpoint(&mut next_state, session).await?;
        Ok(next_state)
    }
}
