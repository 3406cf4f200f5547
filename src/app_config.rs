use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::captioning::CaptionPolicy;
use crate::document::RewriteOptions;
use crate::file_utils::FileManager;

/// Application configuration module
/// This module handles loading and validating the settings shared by the
/// CLI and the batch controller.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Azure Computer Vision endpoint
    #[serde(default)]
    pub endpoint: String,

    /// Subscription key
    #[serde(default, alias = "api_key")]
    pub key: String,

    /// Captions below this confidence are flagged
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Caption cache storage, `~` is expanded
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Extensions considered when walking directories, empty means all
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Marker prepended to weak captions before they are cached
    #[serde(default)]
    pub low_confidence_prefix: Option<String>,

    /// A provider failure aborts the document instead of skipping the image
    #[serde(default)]
    pub abort_on_provider_error: bool,

    /// Candidates requested from the provider
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u32,

    /// Provider HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_threshold() -> f64 {
    0.7
}

fn default_cache_file() -> String {
    "~/.label_captions.json".to_string()
}

fn default_max_candidates() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

/// Default config location
pub fn default_config_path() -> String {
    "~/.labelrc.json".to_string()
}

impl Config {
    /// Load the configuration at `path`
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// parsed is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = FileManager::expand_user_dir(path.as_ref());

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Whether both endpoint and key are present
    pub fn has_credentials(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.key.trim().is_empty()
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("An endpoint is required"));
        }

        if self.key.trim().is_empty() {
            return Err(anyhow!("A subscription key is required"));
        }

        let endpoint = Url::parse(self.endpoint.trim())
            .with_context(|| format!("Invalid endpoint URL: {}", self.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(anyhow!("Endpoint must use http or https: {}", self.endpoint));
        }

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(anyhow!("Threshold must be between 0 and 1, got {}", self.threshold));
        }

        if self.max_candidates == 0 {
            return Err(anyhow!("max_candidates must be at least 1"));
        }

        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }

        Ok(())
    }

    /// Cache file with `~` expanded
    pub fn cache_path(&self) -> PathBuf {
        FileManager::expand_user_dir(Path::new(&self.cache_file))
    }

    /// Provider HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn caption_policy(&self) -> CaptionPolicy {
        CaptionPolicy {
            threshold: self.threshold,
            low_confidence_prefix: self.low_confidence_prefix.clone(),
        }
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            abort_on_provider_error: self.abort_on_provider_error,
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: String::new(),
            key: String::new(),
            threshold: default_threshold(),
            cache_file: default_cache_file(),
            file_types: Vec::new(),
            low_confidence_prefix: None,
            abort_on_provider_error: false,
            max_candidates: default_max_candidates(),
            timeout_secs: default_timeout_secs(),
            log_level: LogLevel::default(),
        }
    }
}
