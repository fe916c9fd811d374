//! Checkpoint store trait

use async_trait::async_trait;
use skilltag_common::Result;
use std::fmt;

/// Identifies one run's checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointKey {
    pub sector_alias: String,
    /// `%Y%m%d_%H%M%S` run identifier; sorts chronologically
    pub run_id: String,
}

impl CheckpointKey {
    pub fn new(sector_alias: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            sector_alias: sector_alias.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_checkpoint_{}", self.sector_alias, self.run_id)
    }
}

/// Key-value blob store for checkpoint documents
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Atomically create or replace the blob for `key`
    async fn put(&self, key: &CheckpointKey, blob: &[u8]) -> Result<()>;

    async fn get(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>>;

    async fn exists(&self, key: &CheckpointKey) -> Result<bool>;

    /// Most recent run for a sector alias
    async fn latest(&self, sector_alias: &str) -> Result<Option<CheckpointKey>>;

    /// Delete the blob; deleting a missing key is not an error
    async fn remove(&self, key: &CheckpointKey) -> Result<()>;
}
