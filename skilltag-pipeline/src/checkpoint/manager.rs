//! Checkpoint manager
//!
//! Serializes [`CheckpointState`] as a versioned JSON document and persists
//! it through a [`CheckpointStore`]. Every failure here is a
//! [`PipelineError::Persistence`]: a save that did not land must stop the
//! run, and a snapshot that cannot be read or fails its invariants is
//! reported instead of being silently replaced by empty state.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use super::store::{CheckpointKey, CheckpointStore};
use crate::error::{PipelineError, PipelineResult};
use crate::models::CheckpointState;

pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    pub fn key_for(state: &CheckpointState) -> CheckpointKey {
        CheckpointKey::new(&state.sector_alias, &state.run_id)
    }

    /// Durably write `state`, stamping `saved_at`
    pub async fn save(&self, state: &mut CheckpointState) -> PipelineResult<()> {
        state.saved_at = Utc::now();
        state.refresh_progress();
        let key = Self::key_for(state);

        let blob = serde_json::to_vec(state).map_err(|e| {
            PipelineError::persistence(format!("cannot encode checkpoint {}: {}", key, e))
        })?;

        self.store.put(&key, &blob).await.map_err(|e| {
            error!(checkpoint = %key, backend = self.store.backend(), error = %e, "Checkpoint save failed");
            PipelineError::persistence(format!("cannot save checkpoint {}: {}", key, e))
        })?;

        info!(
            checkpoint = %key,
            round = state.round.number(),
            processed = state.processed(),
            pending = state.pending.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Most recent snapshot for a sector alias
    ///
    /// `Ok(None)` when no checkpoint exists.
    pub async fn load(&self, sector_alias: &str) -> PipelineResult<Option<CheckpointState>> {
        let key = self.store.latest(sector_alias).await.map_err(|e| {
            PipelineError::persistence(format!("cannot list checkpoints for {}: {}", sector_alias, e))
        })?;
        let Some(key) = key else {
            return Ok(None);
        };
        self.load_key(&key).await
    }

    /// Snapshot stored under `key`
    pub async fn load_key(&self, key: &CheckpointKey) -> PipelineResult<Option<CheckpointState>> {
        let blob = self
            .store
            .get(key)
            .await
            .map_err(|e| PipelineError::persistence(format!("cannot read checkpoint {}: {}", key, e)))?;
        let Some(blob) = blob else {
            return Ok(None);
        };

        let state: CheckpointState = serde_json::from_slice(&blob).map_err(|e| {
            error!(checkpoint = %key, error = %e, "Checkpoint is corrupt");
            PipelineError::persistence(format!("checkpoint {} is corrupt: {}", key, e))
        })?;

        if state.sector_alias != key.sector_alias || state.run_id != key.run_id {
            return Err(PipelineError::persistence(format!(
                "checkpoint {} belongs to {}_{}",
                key, state.sector_alias, state.run_id
            )));
        }
        state.check_invariants().map_err(|e| {
            error!(checkpoint = %key, error = %e, "Checkpoint failed invariant check");
            PipelineError::persistence(format!("checkpoint {} is inconsistent: {}", key, e))
        })?;

        info!(
            checkpoint = %key,
            round = state.round.number(),
            processed = state.processed(),
            pending = state.pending.len(),
            "Checkpoint loaded"
        );
        Ok(Some(state))
    }

    /// Whether a snapshot exists for the state's key
    pub async fn exists(&self, state: &CheckpointState) -> PipelineResult<bool> {
        let key = Self::key_for(state);
        self.store
            .exists(&key)
            .await
            .map_err(|e| PipelineError::persistence(format!("cannot check checkpoint {}: {}", key, e)))
    }

    /// Drop every snapshot for a sector alias without reading it
    ///
    /// Used to start over when the latest snapshot cannot be loaded.
    /// Returns the number of snapshots removed.
    pub async fn discard(&self, sector_alias: &str) -> PipelineResult<usize> {
        let mut removed = 0;
        let mut last: Option<CheckpointKey> = None;
        loop {
            let key = self.store.latest(sector_alias).await.map_err(|e| {
                PipelineError::persistence(format!("cannot list checkpoints for {}: {}", sector_alias, e))
            })?;
            let Some(key) = key else {
                break;
            };
            if last.as_ref() == Some(&key) {
                return Err(PipelineError::persistence(format!(
                    "checkpoint {} could not be removed",
                    key
                )));
            }
            self.store.remove(&key).await.map_err(|e| {
                PipelineError::persistence(format!("cannot remove checkpoint {}: {}", key, e))
            })?;
            info!(checkpoint = %key, "Checkpoint discarded");
            removed += 1;
            last = Some(key);
        }
        Ok(removed)
    }

    /// Remove the run's checkpoint once its artifacts are written
    pub async fn remove(&self, state: &CheckpointState) -> PipelineResult<()> {
        let key = Self::key_for(state);
        self.store
            .remove(&key)
            .await
            .map_err(|e| PipelineError::persistence(format!("cannot remove checkpoint {}: {}", key, e)))?;
        info!(checkpoint = %key, "Checkpoint removed");
        Ok(())
    }
}
