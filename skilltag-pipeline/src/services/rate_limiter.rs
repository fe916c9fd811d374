//! Cumulative-call cooldown limiter
//!
//! Counts completed classification calls across a whole round and demands a
//! fixed cooldown after every N-th one. The orchestrator sizes its dispatch
//! waves with [`CooldownLimiter::calls_until_pause`] so no wave crosses a
//! multiple of N, then sleeps before launching anything else. Call N+1 can
//! therefore never start before the cooldown has elapsed.

use std::time::Duration;

/// Global call counter with a periodic cooldown
#[derive(Debug, Clone)]
pub struct CooldownLimiter {
    every: u64,
    cooldown: Duration,
    calls: u64,
}

impl CooldownLimiter {
    /// `starting_calls` is the number of results already accumulated this
    /// round, so a resumed round keeps its cadence. `every == 0` disables
    /// the cooldown.
    pub fn new(every: u64, cooldown: Duration, starting_calls: u64) -> Self {
        Self {
            every,
            cooldown,
            calls: starting_calls,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Calls that may still be started before the next cooldown
    ///
    /// `None` when the limiter is disabled.
    pub fn calls_until_pause(&self) -> Option<u64> {
        if self.every == 0 {
            return None;
        }
        Some(self.every - self.calls % self.every)
    }

    /// Count one completed call; returns `true` when a cooldown is due
    pub fn record_completion(&mut self) -> bool {
        self.calls += 1;
        self.every != 0 && self.calls % self.every == 0
    }

    /// Sleep for the cooldown
    pub async fn pause(&self) {
        tracing::info!(
            calls = self.calls,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Rate limit reached, cooling down"
        );
        tokio::time::sleep(self.cooldown).await;
    }
}
