//! # Pipeline Error Types
//!
//! Top-level error taxonomy for the migration pipeline. Component errors
//! (`ClusterError`, `QueueError`, `ConfigurationError`) convert into
//! [`PipelineError`] at the orchestration boundary.
//!
//! Polling never times out by design: a stuck snapshot, restore, or reindex
//! task is an operational problem and is fixed by a human, not papered over
//! here. There is no `Timeout` variant on purpose.

use thiserror::Error;

/// Unified error type for pipeline orchestration
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Search engine call failed (transport, auth, 4xx/5xx)
    #[error(transparent)]
    Cluster(#[from] crate::cluster::ClusterError),

    /// Queue transport unavailable or a queue operation failed
    #[error(transparent)]
    Queue(#[from] crate::messaging::QueueError),

    /// Configuration loading or validation failed
    #[error(transparent)]
    Configuration(#[from] crate::config::ConfigurationError),

    /// Mapping transform rejected the source index
    #[error("Transform error for index '{index}': {message}")]
    Transform { index: String, message: String },
}

impl PipelineError {
    /// Create a transform error
    pub fn transform(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            index: index.into(),
            message: message.into(),
        }
    }

}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::transform("logstash-2019.08.01", "no mappings present");
        let display = format!("{err}");
        assert!(display.contains("logstash-2019.08.01"));
        assert!(display.contains("no mappings present"));
    }

    #[test]
    fn test_queue_error_conversion() {
        let queue_err = crate::messaging::QueueError::connection("pool closed");
        let pipeline_err: PipelineError = queue_err.into();
        assert!(matches!(pipeline_err, PipelineError::Queue(_)));
    }
}
