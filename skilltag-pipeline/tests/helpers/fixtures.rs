//! Input fixtures and orchestrator construction

use skilltag_common::events::EventBus;
use skilltag_pipeline::checkpoint::FileCheckpointStore;
use skilltag_pipeline::config::PipelineSettings;
use skilltag_pipeline::models::{CourseRow, FrameworkRow};
use skilltag_pipeline::services::{Classifier, RunInputs, WorkflowOrchestrator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Temporary root with `output/` and `checkpoints/` underneath
pub struct TestDirs {
    pub root: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    pub fn checkpoints(&self) -> PathBuf {
        self.root.path().join("checkpoints")
    }

    /// Checkpoint documents currently on disk
    pub fn checkpoint_files(&self) -> Vec<PathBuf> {
        list(&self.checkpoints(), ".json")
    }

    /// CSV artifacts currently on disk
    pub fn artifact_files(&self) -> Vec<PathBuf> {
        list(&self.output(), ".csv")
    }
}

fn list(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(suffix))
        .collect();
    paths.sort();
    paths
}

/// One knowledge and one ability row per level
pub fn framework(skill: &str, sector: &str, levels: &[u8]) -> Vec<FrameworkRow> {
    levels
        .iter()
        .flat_map(|&level| {
            ["Knowledge", "Ability"].into_iter().map(move |kind| FrameworkRow {
                skill_title: skill.to_string(),
                sector: sector.to_string(),
                proficiency_level: level,
                proficiency_description: Some(format!("{} at level {}", skill, level)),
                classification: Some(kind.to_string()),
                item: Some(format!("{} item {} {}", skill, kind, level)),
            })
        })
        .collect()
}

/// Complete course row titled `Course <course>`
pub fn course_row(course: &str, skill: &str) -> CourseRow {
    CourseRow {
        course_ref_id: Some(course.to_string()),
        skill_title: Some(skill.to_string()),
        course_title: Some(format!("Course {}", course)),
        about: Some(format!("About {}", course)),
        learning_outcomes: Some(format!("Outcomes of {}", course)),
    }
}

/// `n` distinct complete courses, `C001` onwards
pub fn courses(n: usize, skill: &str) -> Vec<CourseRow> {
    (1..=n)
        .map(|i| course_row(&format!("C{:03}", i), skill))
        .collect()
}

/// Run inputs for sector `HR` under alias `hr`
pub fn inputs(framework: Vec<FrameworkRow>, courses: Vec<CourseRow>) -> RunInputs {
    RunInputs {
        framework,
        courses,
        sectors: vec!["HR".to_string()],
        sector_alias: "hr".to_string(),
        fresh: false,
    }
}

/// Batch of 10, no cooldown, checkpoint every 30
pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        batch_size: 10,
        rate_limit_every: 0,
        rate_limit_cooldown: Duration::ZERO,
        checkpoint_every: 30,
    }
}

/// Orchestrator with a file checkpoint store under `dirs`
pub fn orchestrator(
    classifier: Arc<dyn Classifier>,
    dirs: &TestDirs,
    settings: PipelineSettings,
    event_bus: EventBus,
) -> WorkflowOrchestrator {
    let store = Arc::new(FileCheckpointStore::new(dirs.checkpoints()));
    WorkflowOrchestrator::new(classifier, store, settings, dirs.output(), event_bus)
}

/// Artifact rows keyed by header
pub fn read_artifact(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|r| {
            let record = r.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}
