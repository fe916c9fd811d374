//! CSV output artifacts
//!
//! Files are named `<alias>_<artifact>_<run_id>.csv` and written atomically.
//! Headers are always written, so an empty partition still yields a
//! readable table.

use serde::Serialize;
use skilltag_common::config::write_atomic_async;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{CourseRow, CourseSkillRecord, TaggedRecord, COURSE_COLUMNS};

/// Output tables produced by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    R1Valid,
    R1Invalid,
    ValidSkills,
    InvalidSkills,
    AllTaggedSkills,
    OutOfSectorSkills,
    MissingContentCourses,
    PoorQualityCourses,
}

impl Artifact {
    pub fn name(self) -> &'static str {
        match self {
            Artifact::R1Valid => "r1_valid",
            Artifact::R1Invalid => "r1_invalid",
            Artifact::ValidSkills => "valid_skills",
            Artifact::InvalidSkills => "invalid_skills",
            Artifact::AllTaggedSkills => "all_tagged_skills",
            Artifact::OutOfSectorSkills => "out_of_sector_skills",
            Artifact::MissingContentCourses => "missing_content_courses",
            Artifact::PoorQualityCourses => "poor_quality_courses",
        }
    }
}

/// A row type with a fixed header
pub trait ArtifactRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl ArtifactRow for TaggedRecord {
    const HEADERS: &'static [&'static str] = &[
        "Course Reference Number",
        "Skill Title",
        "Course Title",
        "About This Course",
        "What You'll Learn",
        "skill_lower",
        "course_text",
        "unique_id",
        "Sector Relevance",
        "source_round",
        "proficiency_level",
        "reason",
        "confidence",
    ];
}

impl ArtifactRow for CourseRow {
    const HEADERS: &'static [&'static str] = &COURSE_COLUMNS;
}

impl ArtifactRow for CourseSkillRecord {
    const HEADERS: &'static [&'static str] = &[
        "course_ref_id",
        "skill_title",
        "skill_lower",
        "course_title",
        "about",
        "learning_outcomes",
        "course_text",
        "unique_id",
        "sector_relevance",
        "source_round",
    ];
}

/// Encode rows as CSV bytes with the type's header
pub fn encode<T: ArtifactRow>(rows: &[T]) -> PipelineResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(T::HEADERS)
        .map_err(|e| PipelineError::persistence(format!("cannot encode header: {}", e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| PipelineError::persistence(format!("cannot encode row: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::persistence(format!("cannot flush csv: {}", e)))
}

/// Writes one run's artifacts into an output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    sector_alias: String,
    run_id: String,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, sector_alias: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            sector_alias: sector_alias.into(),
            run_id: run_id.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.csv",
            self.sector_alias,
            artifact.name(),
            self.run_id
        ))
    }

    /// Atomically write `rows` as the given artifact
    pub async fn write<T: ArtifactRow>(&self, artifact: Artifact, rows: &[T]) -> PipelineResult<PathBuf> {
        let path = self.path_for(artifact);
        let bytes = encode(rows)?;
        write_atomic_async(&path, &bytes).await.map_err(|e| {
            PipelineError::persistence(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(artifact = artifact.name(), rows = rows.len(), path = %path.display(), "Artifact written");
        Ok(path)
    }
}
