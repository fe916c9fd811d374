//! Tagging run state machine
//!
//! INIT → ROUND1_RUNNING → ROUND1_RECONCILED → ROUND2_RUNNING →
//! ROUND2_RECONCILED → COMPLETE, with STOPPED and FAILED as terminal exits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkpoint::Round;

/// Tagging run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Inputs loading, checkpoint lookup
    Init,
    Round1Running,
    Round1Reconciled,
    Round2Running,
    Round2Reconciled,
    /// Final merge, audit and artifacts done
    Complete,
    /// Stop requested; checkpoint saved for resumption
    Stopped,
    /// Validation or persistence error
    Failed,
}

impl PipelineState {
    /// Running state of a round
    pub fn running(round: Round) -> Self {
        match round {
            Round::R1 => PipelineState::Round1Running,
            Round::R2 => PipelineState::Round2Running,
        }
    }

    /// Reconciled state of a round
    pub fn reconciled(round: Round) -> Self {
        match round {
            Round::R1 => PipelineState::Round1Reconciled,
            Round::R2 => PipelineState::Round2Reconciled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Complete | PipelineState::Stopped | PipelineState::Failed
        )
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: String,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// Progress of the current round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub round: Option<Round>,
    pub processed: usize,
    pub total: usize,
    /// 0.0 - 100.0
    pub percentage: f64,
    pub elapsed_seconds: u64,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self {
            round: None,
            processed: 0,
            total: 0,
            percentage: 0.0,
            elapsed_seconds: 0,
        }
    }
}

/// Counters accumulated across a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Classification calls issued in this process (resumed work excluded)
    pub calls_issued: u64,
    /// Calls that failed and were recorded as unresolved
    pub classification_failures: u64,
    pub rate_limit_pauses: u64,
    pub checkpoints_saved: u64,
    pub r1_valid: usize,
    pub r1_invalid: usize,
    pub r2_valid: usize,
    pub r2_invalid: usize,
}

/// In-memory session for one tagging run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSession {
    pub run_id: String,
    pub sector_alias: String,
    pub state: PipelineState,
    /// Whether the run picked up an existing checkpoint
    pub resumed: bool,
    pub progress: RunProgress,
    pub statistics: RunStatistics,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunSession {
    pub fn new(run_id: impl Into<String>, sector_alias: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            sector_alias: sector_alias.into(),
            state: PipelineState::Init,
            resumed: false,
            progress: RunProgress::default(),
            statistics: RunStatistics::default(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: PipelineState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id.clone(),
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Update progress for the current round
    ///
    /// Within a round the processed count never goes backwards; a smaller
    /// value for the same round is ignored.
    pub fn update_progress(&mut self, round: Round, processed: usize, total: usize) {
        if self.progress.round == Some(round) && processed < self.progress.processed {
            return;
        }
        self.progress.round = Some(round);
        self.progress.processed = processed;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (processed as f64 / total as f64) * 100.0
        } else {
            100.0
        };
        self.progress.elapsed_seconds = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
