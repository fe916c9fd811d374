//! Phases 1 and 2: ROUND1_RUNNING / ROUND2_RUNNING
//!
//! Pending records are taken in batches of `batch_size`. A batch is split
//! into waves no larger than the calls left before the next cooldown, so the
//! cooldown always sits between call N·k and call N·k+1. A wave's results
//! are folded into the round state once all of its workers finish. A
//! checkpoint is written whenever a wave crosses a multiple of
//! `checkpoint_every` processed records, and again when the round ends.

use chrono::Utc;
use futures::StreamExt;
use skilltag_common::events::TaggingEvent;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{RoundEnd, WorkflowOrchestrator};
use crate::error::PipelineResult;
use crate::models::{CheckpointState, CourseSkillRecord, PipelineState, Round, RunSession};
use crate::services::{reference_chart, CooldownLimiter, KnowledgeBase, SkillInfoCache, WorkerPool};

impl WorkflowOrchestrator {
    /// Run the state's round until nothing is pending or a stop is requested
    pub(super) async fn phase_round(
        &self,
        state: &mut CheckpointState,
        session: &mut RunSession,
        knowledge_base: &Arc<KnowledgeBase>,
        cancel_token: &CancellationToken,
    ) -> PipelineResult<RoundEnd> {
        let round = state.round;
        session.transition_to(PipelineState::running(round));
        session.update_progress(round, state.processed(), state.total());
        self.publish(session).await;

        info!(
            run_id = %state.run_id,
            round = round.number(),
            pending = state.pending.len(),
            completed = state.processed(),
            "Round started"
        );
        self.event_bus.emit_lossy(TaggingEvent::RoundStarted {
            run_id: state.run_id.clone(),
            round: round.number(),
            pending: state.pending.len(),
            completed: state.processed(),
            timestamp: Utc::now(),
        });

        let chart = match round {
            Round::R1 => None,
            Round::R2 => Some(Arc::new(reference_chart::render())),
        };
        let skill_cache = Arc::new(SkillInfoCache::new(round, Arc::clone(knowledge_base)));
        let pool = WorkerPool::new(round, Arc::clone(&self.classifier), skill_cache, chart);
        let mut limiter = CooldownLimiter::new(
            self.settings.rate_limit_every,
            self.settings.rate_limit_cooldown,
            state.processed() as u64,
        );

        let queue = state.pending_records();
        for batch in queue.chunks(self.settings.batch_size.max(1)) {
            if cancel_token.is_cancelled() {
                info!(
                    run_id = %state.run_id,
                    round = round.number(),
                    pending = state.pending.len(),
                    "Stop requested, halting between batches"
                );
                return Ok(RoundEnd::Stopped);
            }
            self.run_batch(batch, &pool, &mut limiter, state, session)
                .await?;
        }

        if !state.is_round_complete() {
            warn!(
                run_id = %state.run_id,
                round = round.number(),
                pending = state.pending.len(),
                "Pending fingerprints without records remain after dispatch"
            );
        }

        self.save_checkpoint(state, session).await?;
        info!(
            run_id = %state.run_id,
            round = round.number(),
            processed = state.processed(),
            "Round dispatch complete"
        );
        Ok(RoundEnd::Complete)
    }

    /// Dispatch one batch in cooldown-bounded waves
    async fn run_batch(
        &self,
        batch: &[CourseSkillRecord],
        pool: &WorkerPool,
        limiter: &mut CooldownLimiter,
        state: &mut CheckpointState,
        session: &mut RunSession,
    ) -> PipelineResult<()> {
        let mut offset = 0;
        while offset < batch.len() {
            let room = limiter
                .calls_until_pause()
                .map_or(batch.len(), |n| n as usize);
            let end = batch.len().min(offset + room);
            let wave = &batch[offset..end];
            offset = end;

            debug!(round = state.round.number(), size = wave.len(), "Dispatching wave");
            session.statistics.calls_issued += wave.len() as u64;
            let mut in_flight = pool.dispatch(wave);
            let mut cooldown_due = false;
            let mut completed = Vec::with_capacity(wave.len());

            while let Some(outcome) = in_flight.next().await {
                if outcome.failed {
                    session.statistics.classification_failures += 1;
                }
                cooldown_due |= limiter.record_completion();
                completed.push(outcome.result);
            }

            let before = state.processed();
            for ignored in state.record_results(completed) {
                warn!(unique_id = %ignored.unique_id, "Result for a fingerprint that is not pending, ignored");
            }
            self.broadcast_progress(state, session).await;

            // Save whenever the wave crossed a multiple of the cadence
            let every = self.settings.checkpoint_every;
            if every > 0 && before / every != state.processed() / every {
                self.save_checkpoint(state, session).await?;
            }

            if cooldown_due {
                session.statistics.rate_limit_pauses += 1;
                self.event_bus.emit_lossy(TaggingEvent::RateLimitPause {
                    run_id: state.run_id.clone(),
                    calls: limiter.calls(),
                    cooldown_ms: limiter.cooldown().as_millis() as u64,
                    timestamp: Utc::now(),
                });
                limiter.pause().await;
            }
        }
        Ok(())
    }
}
