//! Runtime configuration.
//!
//! Settings come from an optional YAML file; every key has a default, so an
//! empty file (or no file at all) is a valid configuration. Command-line flags
//! are applied on top by `main`.
//!
//! ```yaml
//! sources:
//!   - https://www.blogdumoderateur.com/web/
//!   - https://www.blogdumoderateur.com/tech/
//! target_count: 30
//! request_delay_ms: 1000
//! request_timeout_secs: 60
//! store_path: data/articles.json
//! ```

use crate::fetch::{FetchConfig, DEFAULT_USER_AGENT};
use crate::pipeline::AggregationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Listing pages visited when no source is configured.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://www.blogdumoderateur.com/web/",
    "https://www.blogdumoderateur.com/digital/",
    "https://www.blogdumoderateur.com/social-media/",
    "https://www.blogdumoderateur.com/tech/",
    "https://www.blogdumoderateur.com/marketing/",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listing pages, visited in order.
    pub sources: Vec<String>,
    /// Maximum number of articles per run, across all sources.
    pub target_count: usize,
    /// Pause between two requests, in milliseconds.
    pub request_delay_ms: u64,
    pub user_agent: String,
    /// Per-request timeout; unset waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// JSON file backing the article store.
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            target_count: 30,
            request_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: None,
            store_path: PathBuf::from("articles.json"),
        }
    }
}

impl Config {
    /// Load `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(sources = config.sources.len(), target = config.target_count, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn aggregation(&self) -> AggregationConfig {
        AggregationConfig {
            target_count: self.target_count,
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }

    pub fn fetch(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}
