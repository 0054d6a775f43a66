//! # Cluster Client
//!
//! Wrapper over the search engine's administrative REST API: snapshot
//! create/delete/status/restore, index lifecycle, cluster health, and the
//! asynchronous reindex task surface.
//!
//! This layer does not retry anything. Every failure surfaces as a
//! [`ClusterError`] and retry policy lives with the caller — for this
//! pipeline that caller is a human operator (see the `inject` recovery
//! command).

pub mod errors;
pub mod http;

pub use errors::ClusterError;
pub use http::HttpClusterClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Engine-reported replication completeness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterHealth {
    Red,
    Yellow,
    Green,
}

/// Lifecycle state of a snapshot in the archive repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotState {
    InProgress,
    Started,
    Success,
    Failed,
    Partial,
    Incompatible,
}

/// One entry from the archive listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot: String,
    pub state: SnapshotState,
    pub indices: Vec<String>,
}

/// Store and document statistics for an index, totals across all shard copies
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    pub store_size_bytes: u64,
    pub doc_count: u64,
}

/// Opaque handle for an asynchronous engine-side task.
///
/// Not persisted anywhere: if the process holding the poll loop dies, the
/// task keeps running server-side but its completion is never observed, and
/// the affected pair needs operator recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle(pub String);

/// Task status as reported by the engine's task API
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskStatus {
    pub completed: bool,
}

/// Administrative API surface consumed by the pipeline roles
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Current mappings of an index (the `mappings` object)
    async fn get_mapping(&self, index: &str) -> Result<serde_json::Value, ClusterError>;

    /// Current settings of an index (the `settings` object)
    async fn get_settings(&self, index: &str) -> Result<serde_json::Value, ClusterError>;

    /// Store/document statistics for an index
    async fn get_stats(&self, index: &str) -> Result<IndexStats, ClusterError>;

    /// Create an index with the given body (mappings + settings)
    async fn create_index(&self, name: &str, body: &serde_json::Value)
        -> Result<(), ClusterError>;

    /// Delete an index. Idempotent: absence is not an error.
    async fn delete_index(&self, name: &str) -> Result<(), ClusterError>;

    /// Flush an index, committing pending segment operations
    async fn flush(&self, index: &str) -> Result<(), ClusterError>;

    /// Cluster-wide health
    async fn health(&self) -> Result<ClusterHealth, ClusterError>;

    /// Start creating a snapshot of exactly one index, unavailable indexes
    /// tolerated and global state excluded
    async fn snapshot_create(&self, repo: &str, name: &str, index: &str)
        -> Result<(), ClusterError>;

    /// Delete a snapshot from the repository
    async fn snapshot_delete(&self, repo: &str, name: &str) -> Result<(), ClusterError>;

    /// Current state of a named snapshot
    async fn snapshot_status(&self, repo: &str, name: &str) -> Result<SnapshotState, ClusterError>;

    /// Start restoring a snapshot with an index rename, global state excluded
    async fn snapshot_restore(
        &self,
        repo: &str,
        name: &str,
        rename_pattern: &str,
        rename_replacement: &str,
    ) -> Result<(), ClusterError>;

    /// Full archive listing for a repository
    async fn list_snapshots(&self, repo: &str) -> Result<Vec<SnapshotInfo>, ClusterError>;

    /// Submit an asynchronous reindex task, returning its handle
    async fn submit_reindex(
        &self,
        source: &str,
        target: &str,
        batch_size: u32,
        script: Option<&str>,
    ) -> Result<TaskHandle, ClusterError>;

    /// Poll an asynchronous task for completion
    async fn poll_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_deserializes_from_engine_payload() {
        let health: ClusterHealth = serde_json::from_str(r#""green""#).unwrap();
        assert_eq!(health, ClusterHealth::Green);
        let health: ClusterHealth = serde_json::from_str(r#""yellow""#).unwrap();
        assert_eq!(health, ClusterHealth::Yellow);
    }

    #[test]
    fn test_snapshot_state_deserializes_from_engine_payload() {
        let state: SnapshotState = serde_json::from_str(r#""SUCCESS""#).unwrap();
        assert_eq!(state, SnapshotState::Success);
        let state: SnapshotState = serde_json::from_str(r#""IN_PROGRESS""#).unwrap();
        assert_eq!(state, SnapshotState::InProgress);
    }
}
