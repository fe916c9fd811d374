//! Phase 0: INIT
//!
//! Builds the knowledge base from the framework and, for a fresh run, the
//! Round 1 work set. When a checkpoint exists for the sector alias the run
//! resumes from it instead: its round, records and results replace anything
//! derived from the course table. A fresh start drops every checkpoint for
//! the alias first, including one that can no longer be read.

use chrono::Utc;
use skilltag_common::events::TaggingEvent;
use std::sync::Arc;
use tracing::{info, warn};

use super::{RunInputs, WorkflowOrchestrator};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{CheckpointState, CourseSkillRecord, Round, RunSession};
use crate::services::{Deduplicator, KnowledgeBase};

/// Everything the round phases need
pub(super) struct Prepared {
    pub knowledge_base: Arc<KnowledgeBase>,
    pub state: CheckpointState,
    /// Terminal rows, written at the end of the run
    pub out_of_sector: Vec<CourseSkillRecord>,
}

/// Sector aliases become part of file names and store keys
fn check_sector_alias(alias: &str) -> PipelineResult<()> {
    if alias.trim().is_empty() {
        return Err(PipelineError::validation("sector alias must not be empty"));
    }
    if alias.contains(['/', '\\']) || alias.contains("..") {
        return Err(PipelineError::validation(format!(
            "sector alias {:?} must not contain path separators",
            alias
        )));
    }
    Ok(())
}

impl WorkflowOrchestrator {
    pub(super) async fn phase_prepare(
        &self,
        inputs: &RunInputs,
        session: &mut RunSession,
    ) -> PipelineResult<Prepared> {
        check_sector_alias(&inputs.sector_alias)?;

        let knowledge_base = KnowledgeBase::build(&inputs.framework, &inputs.sectors);
        if knowledge_base.is_empty() {
            return Err(PipelineError::validation(format!(
                "framework has no skills for sectors {:?}",
                inputs.sectors
            )));
        }

        let dedup = Deduplicator::new(&knowledge_base.skill_set()).build(&inputs.courses);

        if inputs.fresh {
            let discarded = self.checkpoints.discard(&inputs.sector_alias).await?;
            if discarded > 0 {
                warn!(
                    sector_alias = %inputs.sector_alias,
                    discarded,
                    "Fresh start requested, previous checkpoints discarded"
                );
            }
        }

        let state = match self.checkpoints.load(&inputs.sector_alias).await? {
            Some(state) => {
                info!(
                    run_id = %state.run_id,
                    round = state.round.number(),
                    processed = state.processed(),
                    pending = state.pending.len(),
                    "Resuming tagging run from checkpoint"
                );
                session.resumed = true;
                state
            }
            None => {
                if dedup.in_sector.is_empty() {
                    warn!(
                        sector_alias = %inputs.sector_alias,
                        "No course rows match the framework scope"
                    );
                }
                let mut state = CheckpointState::start_round(
                    skilltag_common::time::new_run_id(),
                    &inputs.sector_alias,
                    Round::R1,
                    dedup.in_sector,
                    Vec::new(),
                );
                session.run_id = state.run_id.clone();
                self.save_checkpoint(&mut state, session).await?;
                state
            }
        };

        session.run_id = state.run_id.clone();
        session.started_at = Utc::now();
        self.publish(session).await;

        info!(
            run_id = %state.run_id,
            sector_alias = %inputs.sector_alias,
            skills = knowledge_base.len(),
            resumed = session.resumed,
            "Starting tagging run"
        );

        self.event_bus.emit_lossy(TaggingEvent::RunStarted {
            run_id: state.run_id.clone(),
            sector_alias: inputs.sector_alias.clone(),
            resumed: session.resumed,
            timestamp: Utc::now(),
        });

        Ok(Prepared {
            knowledge_base: Arc::new(knowledge_base),
            state,
            out_of_sector: dedup.out_of_sector,
        })
    }
}
