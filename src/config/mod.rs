pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

use self::validation::validate_config;
use crate::stream::SseDeliveryMode;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Provider family, as far as request payload shape is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-style chat completions.
    #[default]
    OpenAi,
    /// Anthropic-style messages.
    Anthropic,
    /// Local runtimes (Ollama, LM Studio and friends).
    Local,
    /// Aggregators that proxy many upstream models.
    Aggregator,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Aggregator => write!(f, "aggregator"),
        }
    }
}

/// SSE transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub delivery_mode: SseDeliveryMode,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_read_buffer_size() -> usize {
    8 * 1024
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            delivery_mode: SseDeliveryMode::default(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

/// Incremental parse and render-session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_large_message_threshold")]
    pub large_message_threshold: usize,
    #[serde(default = "default_large_message_preview")]
    pub large_message_preview: usize,
    #[serde(default)]
    pub thinking_expanded: bool,
}

fn default_debounce_ms() -> u64 {
    40
}
fn default_large_message_threshold() -> usize {
    25_000
}
fn default_large_message_preview() -> usize {
    10_000
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            large_message_threshold: default_large_message_threshold(),
            large_message_preview: default_large_message_preview(),
            thinking_expanded: false,
        }
    }
}

/// Inline attachment tag delimiters and expansion placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(default = "default_image_tag_start")]
    pub image_tag_start: String,
    #[serde(default = "default_image_tag_end")]
    pub image_tag_end: String,
    #[serde(default = "default_file_tag_start")]
    pub file_tag_start: String,
    #[serde(default = "default_file_tag_end")]
    pub file_tag_end: String,
    #[serde(default = "default_missing_image_placeholder")]
    pub missing_image_placeholder: String,
    #[serde(default = "default_missing_file_placeholder")]
    pub missing_file_placeholder: String,
}

fn default_image_tag_start() -> String {
    "<image-uuid>".to_string()
}
fn default_image_tag_end() -> String {
    "</image-uuid>".to_string()
}
fn default_file_tag_start() -> String {
    "<file-uuid>".to_string()
}
fn default_file_tag_end() -> String {
    "</file-uuid>".to_string()
}
fn default_missing_image_placeholder() -> String {
    "[Image unavailable]".to_string()
}
fn default_missing_file_placeholder() -> String {
    "[File unavailable]".to_string()
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            image_tag_start: default_image_tag_start(),
            image_tag_end: default_image_tag_end(),
            file_tag_start: default_file_tag_start(),
            file_tag_end: default_file_tag_end(),
            missing_image_placeholder: default_missing_image_placeholder(),
            missing_file_placeholder: default_missing_file_placeholder(),
        }
    }
}

/// A configured model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Overrides the capability matrix for this provider.
    #[serde(default)]
    pub accepts_images: Option<bool>,
}

/// Shape of log lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl AppConfig {
    /// Look up a configured provider by name.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|provider| provider.name == name)
    }
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
///
/// # Errors
///
/// Same as [`load_config`] for every failure other than `NotFound`.
pub fn load_config_or_default(path: &str) -> Result<AppConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("config file '{path}' not found, using defaults");
            Ok(AppConfig::default())
        }
        other => other,
    }
}
