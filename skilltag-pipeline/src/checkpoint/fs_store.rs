//! Directory-backed checkpoint store
//!
//! One JSON file per key, named `<alias>_checkpoint_<run_id>.json`, written
//! through a temp file and rename so a crash never leaves a torn document.

use async_trait::async_trait;
use skilltag_common::config::write_atomic_async;
use skilltag_common::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::store::{CheckpointKey, CheckpointStore};

const EXTENSION: &str = ".json";

pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the blob for `key`
    pub fn path_for(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(format!("{}{}", key, EXTENSION))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn put(&self, key: &CheckpointKey, blob: &[u8]) -> Result<()> {
        write_atomic_async(&self.path_for(key), blob).await
    }

    async fn get(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &CheckpointKey) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    async fn latest(&self, sector_alias: &str) -> Result<Option<CheckpointKey>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_checkpoint_", sector_alias);
        let mut latest: Option<String> = None;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(run_id) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(EXTENSION))
            else {
                continue;
            };
            if latest.as_deref().map_or(true, |current| run_id > current) {
                latest = Some(run_id.to_string());
            }
        }

        Ok(latest.map(|run_id| CheckpointKey::new(sector_alias, run_id)))
    }

    async fn remove(&self, key: &CheckpointKey) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
