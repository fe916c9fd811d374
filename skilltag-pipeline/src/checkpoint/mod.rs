//! Durable checkpoint storage
//!
//! [`CheckpointStore`] is a blob store keyed by (sector alias, run id) with
//! atomic overwrite, existence check, and latest-run lookup. The
//! [`CheckpointManager`] layers the versioned JSON document on top.

pub mod fs_store;
pub mod manager;
pub mod sqlite_store;
pub mod store;

pub use fs_store::FileCheckpointStore;
pub use manager::CheckpointManager;
pub use sqlite_store::SqliteCheckpointStore;
pub use store::{CheckpointKey, CheckpointStore};
