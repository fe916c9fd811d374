//! Tabular input and output
//!
//! CSV readers for the framework and course tables (schema checked before
//! any classification starts) and the atomic CSV artifact writer.

pub mod artifacts;
pub mod reader;

pub use artifacts::{Artifact, ArtifactRow, ArtifactWriter};
pub use reader::{read_courses, read_courses_from, read_framework, read_framework_from};
