//! In-memory checkpoint store

use async_trait::async_trait;
use skilltag_common::Result;
use skilltag_pipeline::checkpoint::{CheckpointKey, CheckpointStore};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryCheckpointStore {
    blobs: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    puts: Mutex<usize>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful puts
    pub fn puts(&self) -> usize {
        *self.puts.lock().unwrap()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

fn key_of(key: &CheckpointKey) -> (String, String) {
    (key.sector_alias.clone(), key.run_id.clone())
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &CheckpointKey, blob: &[u8]) -> Result<()> {
        self.blobs.lock().unwrap().insert(key_of(key), blob.to_vec());
        *self.puts.lock().unwrap() += 1;
        Ok(())
    }

    async fn get(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().unwrap().get(&key_of(key)).cloned())
    }

    async fn exists(&self, key: &CheckpointKey) -> Result<bool> {
        Ok(self.blobs.lock().unwrap().contains_key(&key_of(key)))
    }

    async fn latest(&self, sector_alias: &str) -> Result<Option<CheckpointKey>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|(alias, _)| alias == sector_alias)
            .map(|(_, run_id)| run_id.clone())
            .max()
            .map(|run_id| CheckpointKey::new(sector_alias, run_id)))
    }

    async fn remove(&self, key: &CheckpointKey) -> Result<()> {
        self.blobs.lock().unwrap().remove(&key_of(key));
        Ok(())
    }
}
