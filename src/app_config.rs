use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::language_utils::validate_language_code;

/// Application configuration module
///
/// This module handles the job configuration: loading, validating and saving
/// settings. The pipeline consumes but does not own the configuration;
/// callers may build a [`Config`] in code or load `conf.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO 639)
    pub source_language: String,

    /// Target language code (ISO 639)
    pub target_language: String,

    /// Bounded worker pool size shared by layout, translation and rebuild
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Which output artifacts to produce
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Page arrangement of the bilingual artifact
    #[serde(default)]
    pub dual_layout: DualLayout,

    /// Lowest allowed font size as a fraction of the original size before
    /// translated text is allowed to overflow its region box
    #[serde(default = "default_overflow_floor_ratio")]
    pub overflow_floor_ratio: f32,

    /// Embed computed glyph subsets; when false the full font is embedded
    #[serde(default = "default_true")]
    pub font_subsetting_enabled: bool,

    /// Translation backend settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Layout detector settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Substitute font files
    #[serde(default)]
    pub fonts: FontConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Which output artifacts a job produces
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Only the monolingual translated document
    #[default]
    Mono,
    /// Only the bilingual document
    Dual,
    /// Both artifacts
    Both,
}

/// Page arrangement of the bilingual artifact
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DualLayout {
    /// Each source page is immediately followed by its translated page
    #[default]
    Alternate,
    /// Source and translation composited onto one double-width page
    SideBySide,
}

/// Translation backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Chat-completions endpoint. For Azure OpenAI this is the resource
    /// endpoint; for any other OpenAI-compatible server, the base URL.
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model name (ignored when `azure_deployment` is set)
    #[serde(default = "default_model")]
    pub model: String,

    /// Azure deployment name; presence switches the client to Azure
    /// URL addressing
    #[serde(default)]
    pub azure_deployment: Option<String>,

    /// Azure api-version query parameter
    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,

    /// Retry attempts for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds for exponential backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Requests per minute; `None` disables rate limiting
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Per-unit request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Character budget for neighboring-unit context, per side
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: default_model(),
            azure_deployment: None,
            azure_api_version: default_azure_api_version(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            rate_limit: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            context_chars: default_context_chars(),
        }
    }
}

/// Layout detector configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    /// Remote detector endpoint; `None` selects the heuristic detector
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Detector request timeout in seconds
    #[serde(default = "default_detector_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_detector_timeout_secs(),
        }
    }
}

/// Translation cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether the persistent cache is consulted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database path; `None` uses the per-user cache directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Substitute font files, keyed by `<script>` or `<script>-<family>`
/// (e.g. `han`, `han-serif`, `cyrillic-mono`).
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FontConfig {
    /// Font file per script/family key
    #[serde(default)]
    pub files: HashMap<String, PathBuf>,

    /// Universal fallback font file
    #[serde(default)]
    pub fallback: Option<PathBuf>,
}

/// Log level for the application
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Warn,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_worker_count() -> usize {
    4
}

fn default_overflow_floor_ratio() -> f32 {
    0.6
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_azure_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_context_chars() -> usize {
    600
}

fn default_detector_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            worker_count: default_worker_count(),
            output_mode: OutputMode::default(),
            dual_layout: DualLayout::default(),
            overflow_floor_ratio: default_overflow_floor_ratio(),
            font_subsetting_enabled: true,
            translation: TranslationConfig::default(),
            detector: DetectorConfig::default(),
            cache: CacheConfig::default(),
            fonts: FontConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file
    pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::default();
        let content = serde_json::to_string_pretty(&config)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_language_code(&self.source_language)
            .map_err(|_| anyhow!("Invalid source language code: {}", self.source_language))?;
        validate_language_code(&self.target_language)
            .map_err(|_| anyhow!("Invalid target language code: {}", self.target_language))?;

        if self.worker_count == 0 {
            return Err(anyhow!("worker_count must be at least 1"));
        }
        if self.worker_count > 64 {
            return Err(anyhow!("worker_count must be at most 64"));
        }

        if !(0.1..=1.0).contains(&self.overflow_floor_ratio) {
            return Err(anyhow!(
                "overflow_floor_ratio must be within [0.1, 1.0], got {}",
                self.overflow_floor_ratio
            ));
        }

        if self.translation.retry_backoff_ms == 0 {
            return Err(anyhow!("retry_backoff_ms must be positive"));
        }
        if self.translation.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be positive"));
        }
        if let Some(rpm) = self.translation.rate_limit {
            if rpm == 0 {
                return Err(anyhow!("rate_limit must be positive when set"));
            }
        }

        Ok(())
    }

    /// Whether source and target name the same language (identity job)
    pub fn is_identity(&self) -> bool {
        crate::language_utils::language_codes_match(&self.source_language, &self.target_language)
    }
}
