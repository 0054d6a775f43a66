//! # Pipeline Configuration System
//!
//! YAML-based configuration with environment overrides and eager validation.
//! The loaded [`PipelineConfig`] is immutable and threaded explicitly through
//! component constructors; there is no ambient global configuration state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reindexer_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let endpoint = &manager.config().cluster.endpoint;
//! let shard_target = manager.config().pipeline.shard_target_bytes;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use loader::ConfigManager;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read configuration file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigurationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Root configuration structure mirroring reindexer.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Search cluster endpoint and archive repository
    pub cluster: ClusterConfig,

    /// Queue transport settings
    pub queue: QueueConfig,

    /// Pipeline behavior: filtering, sizing, poll cadences
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Search cluster connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster administrative API, e.g. `http://localhost:9200`
    pub endpoint: String,

    /// Snapshot repository name holding the archive
    pub repository: String,

    /// Optional basic auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional basic auth password
    #[serde(default)]
    pub password: Option<String>,
}

/// Queue transport configuration (pgmq over PostgreSQL)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// PostgreSQL connection string for the pgmq transport
    pub database_url: String,
}

/// Pipeline behavior settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    /// Regex an archive entry name must match to be seeded into the backlog
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,

    /// Target size in bytes for one primary shard of a migrated index
    #[serde(default = "default_shard_target_bytes")]
    pub shard_target_bytes: u64,

    /// Batch size hint passed to the engine's reindex operation
    #[serde(default = "default_reindex_batch_size")]
    pub reindex_batch_size: u32,
}

fn default_name_pattern() -> String {
    r"^logstash-\d{4}".to_string()
}

fn default_shard_target_bytes() -> u64 {
    constants::DEFAULT_SHARD_TARGET_BYTES
}

fn default_reindex_batch_size() -> u32 {
    1000
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            name_pattern: default_name_pattern(),
            shard_target_bytes: default_shard_target_bytes(),
            reindex_batch_size: default_reindex_batch_size(),
        }
    }
}

impl PipelineConfig {
    /// Validate the loaded configuration, failing fast on unusable values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cluster.endpoint.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "cluster.endpoint",
                "must not be empty",
            ));
        }
        if self.cluster.repository.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "cluster.repository",
                "must not be empty",
            ));
        }
        if self.queue.database_url.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "queue.database_url",
                "must not be empty",
            ));
        }
        if self.pipeline.shard_target_bytes == 0 {
            return Err(ConfigurationError::invalid(
                "pipeline.shard_target_bytes",
                "must be greater than zero",
            ));
        }
        self.name_pattern()?;
        Ok(())
    }

    /// Compile the archive name pattern
    pub fn name_pattern(&self) -> Result<Regex, ConfigurationError> {
        Regex::new(&self.pipeline.name_pattern).map_err(|e| {
            ConfigurationError::invalid("pipeline.name_pattern", e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> PipelineConfig {
        PipelineConfig {
            cluster: ClusterConfig {
                endpoint: "http://localhost:9200".to_string(),
                repository: "archive".to_string(),
                username: None,
                password: None,
            },
            queue: QueueConfig {
                database_url: "postgresql://localhost/reindexer".to_string(),
            },
            pipeline: PipelineSettings::default(),
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let mut config = sample_config();
        config.cluster.endpoint = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
        assert!(format!("{err}").contains("cluster.endpoint"));
    }

    #[test]
    fn test_zero_shard_target_rejected() {
        let mut config = sample_config();
        config.pipeline.shard_target_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_name_pattern_rejected() {
        let mut config = sample_config();
        config.pipeline.name_pattern = "([unclosed".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_defaults() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.shard_target_bytes, 50 * 1024 * 1024 * 1024);
        assert_eq!(settings.reindex_batch_size, 1000);
        assert!(Regex::new(&settings.name_pattern).is_ok());
    }
}
