//! Round checkpoint state
//!
//! The orchestrator is the only writer of [`CheckpointState`]. Workers hand
//! their results back, and the orchestrator folds them in with
//! [`CheckpointState::record_results`], which keeps `pending` and `results`
//! disjoint and their union equal to the round's work set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::classification::ClassificationResult;
use super::course::CourseSkillRecord;
use super::outcome::TaggedRecord;

/// Checkpoint document version; bumped on any incompatible layout change
pub const CHECKPOINT_VERSION: u32 = 1;

/// Classification round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    #[serde(rename = "r1")]
    R1,
    #[serde(rename = "r2")]
    R2,
}

impl Round {
    pub fn number(self) -> u8 {
        match self {
            Round::R1 => 1,
            Round::R2 => 2,
        }
    }

    /// Round that follows this one, if any (there is no Round 3)
    pub fn next(self) -> Option<Round> {
        match self {
            Round::R1 => Some(Round::R2),
            Round::R2 => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Round::R1 => "r1",
            Round::R2 => "r2",
        }
    }
}

/// Durable snapshot of one round in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub version: u32,
    pub run_id: String,
    pub sector_alias: String,
    pub round: Round,
    /// Outstanding fingerprints, in dispatch order
    pub pending: Vec<String>,
    /// Accumulated results, one per fingerprint
    pub results: Vec<ClassificationResult>,
    /// `len(results) / (len(results) + len(pending))`
    pub progress: f64,
    /// The round's work set
    pub records: Vec<CourseSkillRecord>,
    /// Round 1 valid rows carried into the final merge (empty during Round 1)
    #[serde(default)]
    pub carried_valid: Vec<TaggedRecord>,
    pub saved_at: DateTime<Utc>,
}

impl CheckpointState {
    /// Fresh state for a round: every distinct fingerprint pending, no results
    pub fn start_round(
        run_id: impl Into<String>,
        sector_alias: impl Into<String>,
        round: Round,
        records: Vec<CourseSkillRecord>,
        carried_valid: Vec<TaggedRecord>,
    ) -> Self {
        let mut seen = HashSet::new();
        let pending: Vec<String> = records
            .iter()
            .filter(|r| seen.insert(r.unique_id.clone()))
            .map(|r| r.unique_id.clone())
            .collect();

        let mut state = Self {
            version: CHECKPOINT_VERSION,
            run_id: run_id.into(),
            sector_alias: sector_alias.into(),
            round,
            pending,
            results: Vec::new(),
            progress: 0.0,
            records,
            carried_valid,
            saved_at: Utc::now(),
        };
        state.refresh_progress();
        state
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.pending.len()
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn is_round_complete(&self) -> bool {
        self.pending.is_empty()
    }

    /// Recompute `progress`; an empty round counts as finished
    pub fn refresh_progress(&mut self) {
        let total = self.total();
        self.progress = if total == 0 {
            1.0
        } else {
            self.results.len() as f64 / total as f64
        };
    }

    /// Move a fingerprint from `pending` into `results`
    ///
    /// Returns `false` (and changes nothing) when the fingerprint is not
    /// pending, e.g. a duplicate delivery.
    pub fn record_result(&mut self, result: ClassificationResult) -> bool {
        self.record_results(vec![result]).is_empty()
    }

    /// Fold a whole wave of results with a single pass over `pending`
    ///
    /// Results whose fingerprint is not pending, or repeats earlier in the
    /// wave, are handed back untouched.
    pub fn record_results(
        &mut self,
        results: Vec<ClassificationResult>,
    ) -> Vec<ClassificationResult> {
        let mut accepted: HashSet<String> = HashSet::with_capacity(results.len());
        let mut rejected = Vec::new();
        {
            let open: HashSet<&str> = self.pending.iter().map(String::as_str).collect();
            for result in results {
                if open.contains(result.unique_id.as_str())
                    && accepted.insert(result.unique_id.clone())
                {
                    self.results.push(result);
                } else {
                    rejected.push(result);
                }
            }
        }

        if !accepted.is_empty() {
            self.pending.retain(|id| !accepted.contains(id));
            self.refresh_progress();
        }
        rejected
    }

    /// First record carrying each pending fingerprint, in pending order
    pub fn pending_records(&self) -> Vec<CourseSkillRecord> {
        let by_id = self.records_by_id();
        self.pending
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
            .collect()
    }

    /// Results indexed by fingerprint
    pub fn result_map(&self) -> HashMap<&str, &ClassificationResult> {
        self.results
            .iter()
            .map(|r| (r.unique_id.as_str(), r))
            .collect()
    }

    fn records_by_id(&self) -> HashMap<&str, &CourseSkillRecord> {
        let mut by_id = HashMap::new();
        for record in &self.records {
            by_id.entry(record.unique_id.as_str()).or_insert(record);
        }
        by_id
    }

    /// Verify the structural invariants of a loaded snapshot
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.version != CHECKPOINT_VERSION {
            return Err(format!(
                "unsupported checkpoint version {} (expected {})",
                self.version, CHECKPOINT_VERSION
            ));
        }

        let pending: HashSet<&str> = self.pending.iter().map(String::as_str).collect();
        if pending.len() != self.pending.len() {
            return Err("duplicate fingerprints in pending".to_string());
        }

        let done: HashSet<&str> = self.results.iter().map(|r| r.unique_id.as_str()).collect();
        if done.len() != self.results.len() {
            return Err("duplicate fingerprints in results".to_string());
        }

        if let Some(id) = pending.intersection(&done).next() {
            return Err(format!("fingerprint {} is both pending and completed", id));
        }

        let all: HashSet<&str> = self.records.iter().map(|r| r.unique_id.as_str()).collect();
        let covered: HashSet<&str> = pending.union(&done).copied().collect();
        if covered != all {
            return Err(format!(
                "pending and results cover {} fingerprints but the round has {}",
                covered.len(),
                all.len()
            ));
        }

        if self.records.iter().any(|r| r.source_round != self.round) {
            return Err(format!("records do not all belong to round {}", self.round.label()));
        }

        Ok(())
    }
}
