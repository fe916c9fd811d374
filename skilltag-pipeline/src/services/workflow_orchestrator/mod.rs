//! Tagging workflow orchestrator
//!
//! # State Progression
//! INIT → ROUND1_RUNNING → ROUND1_RECONCILED → ROUND2_RUNNING → ROUND2_RECONCILED → COMPLETE
//!
//! Each step is handled by a dedicated `phase_*` method:
//!
//! - **prepare**: knowledge base, Round 1 records, or an existing checkpoint
//! - **round**: batched dispatch, result folding, periodic checkpoints
//! - **reconcile**: validate a finished round and seed the next one
//! - **finalize**: merge both rounds, audit, write artifacts
//!
//! The orchestrator is the only writer of the round state. A stop request is
//! honoured between batches: the batch in flight finishes, the checkpoint is
//! saved and the run returns [`RunOutcome::Stopped`]. The next run for the
//! same sector alias resumes from that checkpoint, unless it asks for a
//! fresh start.

use chrono::Utc;
use skilltag_common::events::{EventBus, TaggingEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::checkpoint::{CheckpointManager, CheckpointStore};
use crate::config::PipelineSettings;
use crate::error::PipelineResult;
use crate::models::{
    CheckpointState, CourseRow, FrameworkRow, PipelineState, RunOutcome, RunSession,
};
use crate::services::Classifier;
use crate::tables::ArtifactWriter;

// Phase modules (internal implementation)
mod phase_finalize;
mod phase_prepare;
mod phase_reconcile;
mod phase_round;

/// Latest session snapshot, shared with the status API
pub type SessionHandle = Arc<RwLock<Option<RunSession>>>;

/// Inputs to one tagging run
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub framework: Vec<FrameworkRow>,
    pub courses: Vec<CourseRow>,
    /// Framework sectors in scope (empty keeps every sector)
    pub sectors: Vec<String>,
    /// Prefix for checkpoints and artifacts
    pub sector_alias: String,
    /// Discard any checkpoint for the alias and start Round 1 over
    pub fresh: bool,
}

/// How a round's dispatch loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundEnd {
    Complete,
    Stopped,
}

/// Workflow orchestrator service
pub struct WorkflowOrchestrator {
    classifier: Arc<dyn Classifier>,
    checkpoints: CheckpointManager,
    settings: PipelineSettings,
    output_dir: PathBuf,
    event_bus: EventBus,
    session_handle: Option<SessionHandle>,
}

impl WorkflowOrchestrator {
    /// Create new workflow orchestrator
    ///
    /// # Arguments
    /// * `classifier` - Classification service shared by all workers
    /// * `store` - Checkpoint backend
    /// * `settings` - Batching, rate-limit and checkpoint cadence
    /// * `output_dir` - Directory receiving the CSV artifacts
    /// * `event_bus` - Event bus for progress updates
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn CheckpointStore>,
        settings: PipelineSettings,
        output_dir: impl Into<PathBuf>,
        event_bus: EventBus,
    ) -> Self {
        info!(
            classifier = classifier.name(),
            checkpoint_backend = store.backend(),
            batch_size = settings.batch_size,
            rate_limit_every = settings.rate_limit_every,
            checkpoint_every = settings.checkpoint_every,
            "Workflow orchestrator initialized"
        );
        Self {
            classifier,
            checkpoints: CheckpointManager::new(store),
            settings,
            output_dir: output_dir.into(),
            event_bus,
            session_handle: None,
        }
    }

    /// Mirror every session update into `handle`
    pub fn with_session_handle(mut self, handle: SessionHandle) -> Self {
        self.session_handle = Some(handle);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute a complete tagging run
    ///
    /// Resumes from the latest checkpoint for `inputs.sector_alias` when one
    /// exists. Validation and persistence errors are fatal: the session ends
    /// in FAILED and the error is returned.
    pub async fn execute(
        &self,
        inputs: RunInputs,
        cancel_token: CancellationToken,
    ) -> PipelineResult<RunOutcome> {
        let start_time = std::time::Instant::now();
        let mut session = RunSession::new(String::new(), inputs.sector_alias.clone());

        match self
            .run_phases(&inputs, &mut session, start_time, &cancel_token)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    run_id = %session.run_id,
                    sector_alias = %session.sector_alias,
                    state = ?session.state,
                    error = %e,
                    "Tagging run failed"
                );
                session.transition_to(PipelineState::Failed);
                self.publish(&session).await;
                self.event_bus.emit_lossy(TaggingEvent::RunFailed {
                    run_id: session.run_id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        inputs: &RunInputs,
        session: &mut RunSession,
        start_time: std::time::Instant,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<RunOutcome> {
        let prepared = self.phase_prepare(inputs, session).await?;
        let knowledge_base = prepared.knowledge_base;
        let mut state = prepared.state;

        loop {
            if self
                .phase_round(&mut state, session, &knowledge_base, cancel_token)
                .await?
                == RoundEnd::Stopped
            {
                return self.stop(&mut state, session).await;
            }

            let report = self.phase_reconcile(&state, session, &knowledge_base).await;

            match state.round.next() {
                Some(next) => {
                    state = self.phase_advance(state, &report, next, session).await?;
                }
                None => {
                    let run_report = self
                        .phase_finalize(
                            inputs,
                            state,
                            report,
                            prepared.out_of_sector,
                            session,
                            start_time,
                        )
                        .await?;
                    return Ok(RunOutcome::Completed(run_report));
                }
            }
        }
    }

    /// Persist the interrupted round and end the session as STOPPED
    async fn stop(
        &self,
        state: &mut CheckpointState,
        session: &mut RunSession,
    ) -> PipelineResult<RunOutcome> {
        self.save_checkpoint(state, session).await?;
        session.transition_to(PipelineState::Stopped);
        self.publish(session).await;

        info!(
            run_id = %state.run_id,
            round = state.round.number(),
            processed = state.processed(),
            pending = state.pending.len(),
            "Tagging run stopped, resume with the same sector alias"
        );

        self.event_bus.emit_lossy(TaggingEvent::RunStopped {
            run_id: state.run_id.clone(),
            round: state.round.number(),
            pending: state.pending.len(),
            timestamp: Utc::now(),
        });

        Ok(RunOutcome::Stopped {
            run_id: state.run_id.clone(),
            round: state.round,
            pending: state.pending.len(),
        })
    }

    /// Durably save `state` and announce it
    async fn save_checkpoint(
        &self,
        state: &mut CheckpointState,
        session: &mut RunSession,
    ) -> PipelineResult<()> {
        self.checkpoints.save(state).await?;
        session.statistics.checkpoints_saved += 1;

        self.event_bus.emit_lossy(TaggingEvent::CheckpointSaved {
            run_id: state.run_id.clone(),
            round: state.round.number(),
            pending: state.pending.len(),
            completed: state.processed(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Broadcast round progress and mirror the session
    async fn broadcast_progress(&self, state: &CheckpointState, session: &mut RunSession) {
        session.update_progress(state.round, state.processed(), state.total());
        self.publish(session).await;

        self.event_bus.emit_lossy(TaggingEvent::Progress {
            run_id: state.run_id.clone(),
            round: state.round.number(),
            processed: state.processed(),
            total: state.total(),
            fraction: state.progress,
            timestamp: Utc::now(),
        });
    }

    async fn publish(&self, session: &RunSession) {
        if let Some(handle) = &self.session_handle {
            *handle.write().await = Some(session.clone());
        }
    }

    fn artifact_writer(&self, state: &CheckpointState) -> ArtifactWriter {
        ArtifactWriter::new(&self.output_dir, &state.sector_alias, &state.run_id)
    }
}
