//! Event types for the tagging pipeline
//!
//! Provides the shared `TaggingEvent` definitions and the `EventBus` used to
//! publish run progress to external observers (status API, logs, tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline events
///
/// Events are broadcast via [`EventBus`] and serialize to JSON for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaggingEvent {
    /// A run started (fresh or resumed from a checkpoint)
    RunStarted {
        run_id: String,
        sector_alias: String,
        resumed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A classification round began dispatching
    RoundStarted {
        run_id: String,
        /// 1 or 2
        round: u8,
        pending: usize,
        completed: usize,
        timestamp: DateTime<Utc>,
    },

    /// One or more classification calls completed
    Progress {
        run_id: String,
        round: u8,
        processed: usize,
        total: usize,
        /// 0.0 - 1.0, non-decreasing within a round
        fraction: f64,
        timestamp: DateTime<Utc>,
    },

    /// The rate limiter paused dispatch
    RateLimitPause {
        run_id: String,
        calls: u64,
        cooldown_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A checkpoint was durably written
    CheckpointSaved {
        run_id: String,
        round: u8,
        pending: usize,
        completed: usize,
        timestamp: DateTime<Utc>,
    },

    /// A round's results were reconciled against the framework
    RoundReconciled {
        run_id: String,
        round: u8,
        valid: usize,
        invalid: usize,
        untagged: usize,
        timestamp: DateTime<Utc>,
    },

    /// All artifacts were written
    RunCompleted {
        run_id: String,
        valid: usize,
        invalid: usize,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// The run honoured a stop request between batches
    RunStopped {
        run_id: String,
        round: u8,
        pending: usize,
        timestamp: DateTime<Utc>,
    },

    /// The run aborted with a fatal error
    RunFailed {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl TaggingEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            TaggingEvent::RunStarted { .. } => "RunStarted",
            TaggingEvent::RoundStarted { .. } => "RoundStarted",
            TaggingEvent::Progress { .. } => "Progress",
            TaggingEvent::RateLimitPause { .. } => "RateLimitPause",
            TaggingEvent::CheckpointSaved { .. } => "CheckpointSaved",
            TaggingEvent::RoundReconciled { .. } => "RoundReconciled",
            TaggingEvent::RunCompleted { .. } => "RunCompleted",
            TaggingEvent::RunStopped { .. } => "RunStopped",
            TaggingEvent::RunFailed { .. } => "RunFailed",
        }
    }

    /// Whether the event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaggingEvent::RunCompleted { .. }
                | TaggingEvent::RunStopped { .. }
                | TaggingEvent::RunFailed { .. }
        )
    }
}

/// Broadcast channel for [`TaggingEvent`]s
///
/// Cloning the bus shares the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TaggingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// ```
    /// use skilltag_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TaggingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TaggingEvent,
    ) -> Result<usize, broadcast::error::SendError<TaggingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where nobody is listening
    pub fn emit_lossy(&self, event: TaggingEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
