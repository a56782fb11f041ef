use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CompileConfig, DEFAULT_SANDBOX_PATH, Language, RunConfig, SourceFileName,
};
use crate::types::{MountConfig, ResourceLimits};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Holds the full default language registry; library users can access
/// this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../arbiter.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid source file name: {0:?}")]
    InvalidSourceFileName(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for the execution core
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the Isolate binary (uses PATH if not specified).
    #[serde(default)]
    pub isolate_path: Option<PathBuf>,

    /// Lowest box id handed out by the pool
    #[serde(default = "default_box_min_id")]
    pub box_min_id: u32,

    /// Highest box id handed out by the pool
    #[serde(default = "default_box_max_id")]
    pub box_max_id: u32,

    /// Allow sandboxed programs to reach the network. Off by default;
    /// isolate denies network access unless `--share-net` is passed.
    #[serde(default)]
    pub share_net: bool,

    /// Global directory mounts applied to all sandbox invocations
    /// (both compilation and execution).
    #[serde(default)]
    pub sandbox_mounts: Vec<MountConfig>,

    /// Default resource limits applied to all executions.
    /// Per-language and per-invocation limits layer on top.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Language configurations keyed by language tag
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

impl Config {
    /// Create a new config with the embedded default language registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            isolate_path: None,
            box_min_id: default_box_min_id(),
            box_max_id: default_box_max_id(),
            share_net: false,
            sandbox_mounts: Vec::new(),
            default_limits: ResourceLimits::default(),
            languages: HashMap::new(),
        }
    }

    /// Get a language by tag
    pub fn get_language(&self, tag: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(tag)
            .ok_or_else(|| ConfigError::LanguageNotFound(tag.to_string()))
    }

    /// Get the path to the isolate binary
    pub fn isolate_binary(&self) -> PathBuf {
        self.isolate_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("isolate"))
    }

    /// Number of box ids in the configured range
    pub fn box_count(&self) -> u32 {
        self.box_max_id - self.box_min_id + 1
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_box_min_id() -> u32 {
    0
}

fn default_box_max_id() -> u32 {
    999
}
