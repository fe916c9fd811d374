//! Test Helper Utilities
//!
//! Shared utilities for testing skilltag-pipeline

#![allow(dead_code)]

pub mod fixtures;
pub mod memory_store;
pub mod scripted_classifier;

// Re-export commonly used items
pub use fixtures::{
    course_row, courses, fast_settings, framework, inputs, orchestrator, read_artifact,
    TestDirs,
};
pub use memory_store::MemoryCheckpointStore;
pub use scripted_classifier::{title_of, CallRecord, ScriptedClassifier};
