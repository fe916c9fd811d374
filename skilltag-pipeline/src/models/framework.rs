//! Framework (authoritative reference) table rows

use serde::{Deserialize, Deserializer, Serialize};

/// Exact column names of the framework table
pub const FRAMEWORK_COLUMNS: [&str; 6] = [
    "TSC_CCS Title",
    "Sector",
    "Proficiency Level",
    "Proficiency Description",
    "Knowledge / Ability Classification",
    "Knowledge / Ability Items",
];

/// Normalized skill key: trimmed and lowercased
pub fn skill_key(skill_title: &str) -> String {
    skill_title.trim().to_lowercase()
}

/// Knowledge vs. ability classification of a framework item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Knowledge,
    Ability,
}

impl ItemKind {
    /// Case-insensitive parse; anything else is unclassified
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "knowledge" => Some(ItemKind::Knowledge),
            "ability" => Some(ItemKind::Ability),
            _ => None,
        }
    }
}

/// One row of the framework table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkRow {
    #[serde(rename = "TSC_CCS Title")]
    pub skill_title: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Proficiency Level", deserialize_with = "deserialize_level")]
    pub proficiency_level: u8,
    #[serde(rename = "Proficiency Description", default)]
    pub proficiency_description: Option<String>,
    #[serde(rename = "Knowledge / Ability Classification", default)]
    pub classification: Option<String>,
    #[serde(rename = "Knowledge / Ability Items", default)]
    pub item: Option<String>,
}

impl FrameworkRow {
    pub fn skill_key(&self) -> String {
        skill_key(&self.skill_title)
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        self.classification.as_deref().and_then(ItemKind::parse)
    }

    /// Whether this row belongs to one of the target sectors (exact, trimmed match)
    pub fn in_sectors(&self, sectors: &[String]) -> bool {
        let sector = self.sector.trim();
        sectors.iter().any(|s| s.trim() == sector)
    }
}

/// Parse a proficiency level cell; spreadsheets often export integers as `3.0`
pub fn parse_level(raw: &str) -> Result<u8, String> {
    let trimmed = raw.trim();
    if let Ok(level) = trimmed.parse::<u8>() {
        return Ok(level);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && (0.0..=255.0).contains(&value) => Ok(value as u8),
        _ => Err(format!("invalid proficiency level '{}'", raw)),
    }
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_level(&raw).map_err(serde::de::Error::custom)
}
