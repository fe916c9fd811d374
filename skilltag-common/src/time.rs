//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used for run identifiers; sorts lexicographically in time order
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Run identifier for a run starting at `at`
pub fn run_id_at(at: DateTime<Utc>) -> String {
    at.format(RUN_ID_FORMAT).to_string()
}

/// Run identifier for a run starting now
pub fn new_run_id() -> String {
    run_id_at(now())
}

/// Parse a run identifier back into its timestamp, if it has the standard shape
pub fn parse_run_id(run_id: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(run_id, RUN_ID_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
