//! Configuration resolution for skilltag-pipeline
//!
//! Pipeline knobs resolve CLI → TOML → built-in default. The classifier API
//! key resolves ENV → TOML.

use skilltag_common::config::{ClassifierToml, PipelineToml, TomlConfig};
use skilltag_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the classifier API key
pub const API_KEY_ENV_VAR: &str = "SKILLTAG_API_KEY";

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_RATE_LIMIT_EVERY: u64 = 40;
pub const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 30;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_SEED: u64 = 6800;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Batching, rate-limit and checkpoint cadence for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Records dispatched per batch; also the worker pool width
    pub batch_size: usize,
    /// Cooldown after every N completed calls (0 disables)
    pub rate_limit_every: u64,
    pub rate_limit_cooldown: Duration,
    /// Checkpoint after every K processed records (0 = only at round end)
    pub checkpoint_every: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            rate_limit_every: DEFAULT_RATE_LIMIT_EVERY,
            rate_limit_cooldown: Duration::from_secs(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

/// Command-line overrides for [`PipelineSettings`]
#[derive(Debug, Clone, Default)]
pub struct PipelineOverrides {
    pub batch_size: Option<usize>,
    pub rate_limit_every: Option<u64>,
    pub rate_limit_cooldown_secs: Option<u64>,
    pub checkpoint_every: Option<usize>,
}

impl PipelineSettings {
    /// Merge CLI overrides over the TOML `[pipeline]` section
    pub fn resolve(overrides: &PipelineOverrides, toml: &PipelineToml) -> Result<Self> {
        let batch_size = overrides
            .batch_size
            .or(toml.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }

        let cooldown_secs = overrides
            .rate_limit_cooldown_secs
            .or(toml.rate_limit_cooldown_secs)
            .unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN_SECS);

        Ok(Self {
            batch_size,
            rate_limit_every: overrides
                .rate_limit_every
                .or(toml.rate_limit_every)
                .unwrap_or(DEFAULT_RATE_LIMIT_EVERY),
            rate_limit_cooldown: Duration::from_secs(cooldown_secs),
            checkpoint_every: overrides
                .checkpoint_every
                .or(toml.checkpoint_every)
                .unwrap_or(DEFAULT_CHECKPOINT_EVERY),
        })
    }
}

/// Connection settings for the live classification service
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub seed: u64,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub api_key: String,
}

impl ClassifierSettings {
    /// Build from the TOML `[classifier]` section and a resolved key
    pub fn from_toml(toml: &ClassifierToml, api_key: String) -> Self {
        Self {
            base_url: toml
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: toml.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: toml.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            seed: toml.seed.unwrap_or(DEFAULT_SEED),
            timeout: Duration::from_secs(toml.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            requests_per_second: toml
                .requests_per_second
                .unwrap_or(DEFAULT_REQUESTS_PER_SECOND)
                .max(1),
            api_key,
        }
    }
}

/// Resolve the classifier API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .classifier
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Classifier API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Classifier API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Classifier API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Classifier API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [classifier] api_key = \"your-key\"\n\
         \n\
         Or run with --stub-classifier for a dry run.",
        API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve an output directory: CLI → TOML → `<root>/<default_name>`
pub fn resolve_dir(
    cli_arg: Option<&Path>,
    toml_value: Option<&Path>,
    root_folder: &Path,
    default_name: &str,
) -> PathBuf {
    cli_arg
        .or(toml_value)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root_folder.join(default_name))
}
