//! SQLite-backed checkpoint store
//!
//! Rows live in the `checkpoints` table created by
//! [`skilltag_common::db::init_database`]. Writes are single-statement
//! upserts retried on lock contention.

use async_trait::async_trait;
use skilltag_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

use super::store::{CheckpointKey, CheckpointStore};
use crate::utils::retry_on_lock;

/// Upper bound on lock retries for one statement
const MAX_LOCK_WAIT_MS: u64 = 5000;

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database file and its schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = skilltag_common::db::init_database(db_path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn put(&self, key: &CheckpointKey, blob: &[u8]) -> Result<()> {
        retry_on_lock("checkpoint put", MAX_LOCK_WAIT_MS, || async {
            sqlx::query(
                r#"
                INSERT INTO checkpoints (sector_alias, run_id, payload, saved_at)
                VALUES (?, ?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(sector_alias, run_id)
                DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at
                "#,
            )
            .bind(&key.sector_alias)
            .bind(&key.run_id)
            .bind(blob)
            .execute(&self.pool)
            .await?;
            Ok::<_, Error>(())
        })
        .await
    }

    async fn get(&self, key: &CheckpointKey) -> Result<Option<Vec<u8>>> {
        retry_on_lock("checkpoint get", MAX_LOCK_WAIT_MS, || async {
            let payload: Option<Vec<u8>> = sqlx::query_scalar(
                "SELECT payload FROM checkpoints WHERE sector_alias = ? AND run_id = ?",
            )
            .bind(&key.sector_alias)
            .bind(&key.run_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, Error>(payload)
        })
        .await
    }

    async fn exists(&self, key: &CheckpointKey) -> Result<bool> {
        retry_on_lock("checkpoint exists", MAX_LOCK_WAIT_MS, || async {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM checkpoints WHERE sector_alias = ? AND run_id = ?",
            )
            .bind(&key.sector_alias)
            .bind(&key.run_id)
            .fetch_one(&self.pool)
            .await?;
            Ok::<_, Error>(count > 0)
        })
        .await
    }

    async fn latest(&self, sector_alias: &str) -> Result<Option<CheckpointKey>> {
        retry_on_lock("checkpoint latest", MAX_LOCK_WAIT_MS, || async {
            let run_id: Option<String> = sqlx::query_scalar(
                "SELECT run_id FROM checkpoints WHERE sector_alias = ? ORDER BY run_id DESC LIMIT 1",
            )
            .bind(sector_alias)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, Error>(run_id.map(|run_id| CheckpointKey::new(sector_alias, run_id)))
        })
        .await
    }

    async fn remove(&self, key: &CheckpointKey) -> Result<()> {
        retry_on_lock("checkpoint remove", MAX_LOCK_WAIT_MS, || async {
            sqlx::query("DELETE FROM checkpoints WHERE sector_alias = ? AND run_id = ?")
                .bind(&key.sector_alias)
                .bind(&key.run_id)
                .execute(&self.pool)
                .await?;
            Ok::<_, Error>(())
        })
        .await
    }
}
