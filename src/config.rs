//! Engine configuration, loaded from YAML with complete defaults.
//!
//! Every tunable carries a `#[serde(default = ...)]` so a partial or absent config file still
//! produces something usable, rather than failing startup over one missing key.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_vision_model")]
    pub model: String,
    #[serde(default = "default_vision_max_retries")]
    pub max_retries: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vision_endpoint(),
            model: default_vision_model(),
            max_retries: default_vision_max_retries(),
        }
    }
}

fn default_vision_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_vision_model() -> String {
    "gpt-4-vision".to_string()
}

fn default_vision_max_retries() -> u32 {
    3
}

/// Top-level engine configuration, deserialized from a YAML document via `serde_yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_expect_timeout_seconds")]
    pub default_expect_timeout_seconds: u32,
    #[serde(default = "default_expect_retry_intervals_ms")]
    pub expect_retry_intervals_ms: Vec<u64>,
    #[serde(default = "default_post_action_delay_ms")]
    pub post_action_delay_ms: u64,
    #[serde(default = "default_post_click_delay_ms")]
    pub post_click_delay_ms: u64,
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_expect_timeout_seconds() -> u32 {
    30
}

fn default_expect_retry_intervals_ms() -> Vec<u64> {
    vec![500, 1000, 2000]
}

fn default_post_action_delay_ms() -> u64 {
    300
}

fn default_post_click_delay_ms() -> u64 {
    200
}

fn default_typing_delay_ms() -> u64 {
    50
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_expect_timeout_seconds: default_expect_timeout_seconds(),
            expect_retry_intervals_ms: default_expect_retry_intervals_ms(),
            post_action_delay_ms: default_post_action_delay_ms(),
            post_click_delay_ms: default_post_click_delay_ms(),
            typing_delay_ms: default_typing_delay_ms(),
            resolution: Resolution::default(),
            vision: VisionConfig::default(),
            log_dir: default_log_dir(),
        }
    }
}

/// Errors loading a `Config` from disk. Kept distinct from the engine's own error taxonomy
/// since this is a startup-time, not task-execution-time, failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    /// Loads a `Config` from a YAML file, falling back to defaults for any absent field.
    pub fn load_yaml_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }
}
