//! Classification results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proficiency level meaning "unresolved / unsure"; never a valid tag
pub const UNRESOLVED_LEVEL: u8 = 0;

/// Self-reported confidence of the classification service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(format!("unknown confidence '{}'", other)),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

/// Outcome of one classification call for one fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub unique_id: String,
    /// 0 = unresolved
    pub proficiency_level: u8,
    pub reason: String,
    /// `None` when the call failed or the service returned no usable confidence
    pub confidence: Option<Confidence>,
}

impl ClassificationResult {
    /// Sentinel recorded when a call fails, so the record still advances
    pub fn unresolved(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            proficiency_level: UNRESOLVED_LEVEL,
            reason: String::new(),
            confidence: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.proficiency_level != UNRESOLVED_LEVEL
    }

    /// Confidence as written to tabular output ("" when absent)
    pub fn confidence_label(&self) -> String {
        self.confidence.map(|c| c.to_string()).unwrap_or_default()
    }
}
