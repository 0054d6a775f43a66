//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! detection, and environment-variable overrides for deploy-time secrets.

use super::{ConfigurationError, PipelineConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Loaded configuration plus the environment it was resolved for
pub struct ConfigManager {
    config: PipelineConfig,
    environment: String,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    ///
    /// The file path is taken from `REINDEXER_CONFIG` when set, otherwise
    /// `config/reindexer.yaml` relative to the working directory.
    pub fn load() -> Result<Arc<ConfigManager>, ConfigurationError> {
        let path = env::var("REINDEXER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_config_path());
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific YAML file
    pub fn load_from_path(path: &Path) -> Result<Arc<ConfigManager>, ConfigurationError> {
        let environment = Self::detect_environment();

        debug!(
            "Loading configuration for environment '{}' from: {}",
            environment,
            path.display()
        );

        if !path.exists() {
            return Err(ConfigurationError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config: PipelineConfig =
            serde_yaml::from_str(&contents).map_err(|e| ConfigurationError::Parse {
                message: e.to_string(),
            })?;

        Self::apply_env_overrides(&mut config);
        config.validate()?;

        debug!(
            environment = %environment,
            endpoint = %config.cluster.endpoint,
            repository = %config.cluster.repository,
            "✅ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            config_path: path.to_path_buf(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the detected environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the path the configuration was loaded from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Secrets come from the process environment, never from the YAML file
    fn apply_env_overrides(config: &mut PipelineConfig) {
        if let Ok(url) = env::var("REINDEXER_DATABASE_URL") {
            config.queue.database_url = url;
        }
        if let Ok(username) = env::var("REINDEXER_CLUSTER_USERNAME") {
            config.cluster.username = Some(username);
        }
        if let Ok(password) = env::var("REINDEXER_CLUSTER_PASSWORD") {
            config.cluster.password = Some(password);
        }
    }

    fn detect_environment() -> String {
        env::var("REINDEXER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config").join("reindexer.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
cluster:
  endpoint: "http://localhost:9200"
  repository: "archive"
queue:
  database_url: "postgresql://localhost/reindexer"
pipeline:
  name_pattern: '^logstash-\d{8}'
  shard_target_bytes: 53687091200
"#;

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE_YAML.as_bytes()).expect("write yaml");

        let manager = ConfigManager::load_from_path(file.path()).expect("load config");
        let config = manager.config();

        assert_eq!(config.cluster.endpoint, "http://localhost:9200");
        assert_eq!(config.cluster.repository, "archive");
        assert_eq!(config.pipeline.shard_target_bytes, 50 * 1024 * 1024 * 1024);
        assert_eq!(config.pipeline.name_pattern, r"^logstash-\d{8}");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ConfigManager::load_from_path(Path::new("/nonexistent/reindexer.yaml"))
            .err()
            .expect("should fail");
        assert!(matches!(err, ConfigurationError::FileNotFound { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"cluster: [not a mapping").expect("write yaml");

        let err = ConfigManager::load_from_path(file.path())
            .err()
            .expect("should fail");
        assert!(matches!(err, ConfigurationError::Parse { .. }));
    }
}
