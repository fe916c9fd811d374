//! Framework and course table readers

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{CourseRow, FrameworkRow, COURSE_COLUMNS, FRAMEWORK_COLUMNS};

fn open(path: &Path, table: &str) -> PipelineResult<File> {
    File::open(path).map_err(|e| {
        PipelineError::validation(format!(
            "cannot open {} table {}: {}",
            table,
            path.display(),
            e
        ))
    })
}

/// Read every row of a table after checking its header
fn read_table<T, R>(reader: R, table: &str, required: &[&str]) -> PipelineResult<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| PipelineError::validation(format!("{} table header unreadable: {}", table, e)))?
        .clone();
    let present: HashSet<&str> = headers.iter().collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::validation(format!(
            "{} table is missing required columns: {}",
            table,
            missing.join(", ")
        )));
    }

    let extra: Vec<&str> = headers.iter().filter(|h| !required.contains(h)).collect();
    if !extra.is_empty() {
        info!(table, columns = ?extra, "Ignoring extra columns");
    }

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<T>().enumerate() {
        // +2: header line, 1-based numbering
        let row = record.map_err(|e| {
            PipelineError::validation(format!("{} table row {}: {}", table, index + 2, e))
        })?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(PipelineError::validation(format!("{} table has no rows", table)));
    }

    Ok(rows)
}

/// Read the framework table from any reader
pub fn read_framework_from<R: Read>(reader: R) -> PipelineResult<Vec<FrameworkRow>> {
    let rows: Vec<FrameworkRow> = read_table(reader, "framework", &FRAMEWORK_COLUMNS)?;
    let blank = rows.iter().filter(|r| r.skill_key().is_empty()).count();
    if blank > 0 {
        warn!(rows = blank, "Framework rows without a skill title will be ignored");
    }
    Ok(rows)
}

/// Read the framework table from a CSV file
pub fn read_framework(path: &Path) -> PipelineResult<Vec<FrameworkRow>> {
    let rows = read_framework_from(open(path, "framework")?)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded framework table");
    Ok(rows)
}

/// Read the course table from any reader
pub fn read_courses_from<R: Read>(reader: R) -> PipelineResult<Vec<CourseRow>> {
    read_table(reader, "course", &COURSE_COLUMNS)
}

/// Read the course table from a CSV file
pub fn read_courses(path: &Path) -> PipelineResult<Vec<CourseRow>> {
    let rows = read_courses_from(open(path, "course")?)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded course table");
    Ok(rows)
}
