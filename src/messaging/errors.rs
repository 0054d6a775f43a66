//! # Queue Error Types
//!
//! Structured error handling for the queue transport using thiserror.

use thiserror::Error;

/// Queue transport error types
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue transport connection error: {message}")]
    Connection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    Operation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Message serialization error: {message}")]
    Serialization { message: String },

    #[error("Message deserialization error: {message}")]
    Deserialization { message: String },
}

impl QueueError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a queue operation error
    pub fn operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                QueueError::connection(err.to_string())
            }
            other => QueueError::operation("unknown", "query", other.to_string()),
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() {
            QueueError::Deserialization {
                message: err.to_string(),
            }
        } else {
            QueueError::Serialization {
                message: err.to_string(),
            }
        }
    }
}

impl From<pgmq::errors::PgmqError> for QueueError {
    fn from(err: pgmq::errors::PgmqError) -> Self {
        QueueError::operation("unknown", "pgmq", err.to_string())
    }
}

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueueError::operation("snapshot_ops", "send", "connection reset");
        let display = format!("{err}");
        assert!(display.contains("snapshot_ops"));
        assert!(display.contains("send"));
        assert!(display.contains("connection reset"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let queue_err: QueueError = json_err.into();
        assert!(matches!(queue_err, QueueError::Deserialization { .. }));
    }
}
