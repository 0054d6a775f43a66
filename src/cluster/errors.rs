//! # Cluster Error Types
//!
//! Every engine call fails with a `ClusterError` carrying the operation name
//! and the cause. Transport failures and HTTP status failures are kept apart
//! because operators triage them differently.

use thiserror::Error;

/// Search engine call failure
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Cluster call '{op}' failed: {source}")]
    Transport {
        op: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Cluster call '{op}' returned HTTP {status}: {body}")]
    Status { op: String, status: u16, body: String },

    #[error("Cluster call '{op}' returned an unreadable payload: {cause}")]
    Payload { op: String, cause: String },
}

impl ClusterError {
    /// Create a transport error
    pub fn transport(op: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            op: op.into(),
            source,
        }
    }

    /// Create an HTTP status error
    pub fn status(op: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            op: op.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a payload decode error
    pub fn payload(op: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Payload {
            op: op.into(),
            cause: cause.into(),
        }
    }
}
