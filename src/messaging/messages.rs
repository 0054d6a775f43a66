//! # Job Messages
//!
//! Wire types for the two job topics and the backlog. The original action
//! tag was a free-form string; here it is the closed [`SnapshotAction`] enum
//! so an illegal action cannot be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of archived data: a snapshot containing exactly one index.
///
/// Created once by bootstrap from the archive listing, consumed exactly once
/// by a restore cycle, never re-created except by an operator `inject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub snapshot: String,
    pub index: String,
}

impl SnapshotRecord {
    pub fn new(snapshot: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
            index: index.into(),
        }
    }
}

/// Action requested of the snapshot manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotAction {
    /// Restore `snapshot` into a `{index}-base` working copy
    Restore,
    /// Archive the finished `index` into `snapshot`, then delete the pair
    Snapshot,
}

/// Metadata carried on every queued job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub enqueued_at: DateTime<Utc>,
}

impl Default for JobMetadata {
    fn default() -> Self {
        Self {
            enqueued_at: Utc::now(),
        }
    }
}

/// Job on the `snapshot_ops` topic, consumed serially by the manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotJob {
    pub action: SnapshotAction,
    pub snapshot: String,
    pub index: String,
    #[serde(default)]
    pub metadata: JobMetadata,
}

impl SnapshotJob {
    /// Restore job for a backlog record
    pub fn restore(record: SnapshotRecord) -> Self {
        Self {
            action: SnapshotAction::Restore,
            snapshot: record.snapshot,
            index: record.index,
            metadata: JobMetadata::default(),
        }
    }

    /// Snapshot job archiving a reindexed target
    pub fn snapshot(snapshot: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            action: SnapshotAction::Snapshot,
            snapshot: snapshot.into(),
            index: index.into(),
            metadata: JobMetadata::default(),
        }
    }
}

/// Job on the `reindex_ops` topic, consumed by the worker pool.
///
/// `index` is the original index name; the restored working copy is
/// `{index}-base` and the reindex target is a freshly created `{index}`.
/// `snapshot` names the archive entry the pair came from and the snapshot
/// the finished target will be archived into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexJob {
    pub snapshot: String,
    pub index: String,
    #[serde(default)]
    pub metadata: JobMetadata,
}

impl ReindexJob {
    pub fn new(snapshot: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
            index: index.into(),
            metadata: JobMetadata::default(),
        }
    }

    /// Name of the restored working copy this job reads from
    pub fn source_index(&self) -> String {
        crate::constants::working_copy(&self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_job_serialization() {
        let job = SnapshotJob::restore(SnapshotRecord::new("logstash-20190801", "logstash-2019.08.01"));

        let serialized = serde_json::to_string(&job).expect("Failed to serialize");
        assert!(serialized.contains(r#""action":"restore""#));

        let deserialized: SnapshotJob =
            serde_json::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized.action, SnapshotAction::Restore);
        assert_eq!(deserialized.snapshot, "logstash-20190801");
        assert_eq!(deserialized.index, "logstash-2019.08.01");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let raw = r#"{"action":"defragment","snapshot":"s","index":"i"}"#;
        assert!(serde_json::from_str::<SnapshotJob>(raw).is_err());
    }

    #[test]
    fn test_reindex_job_source_index() {
        let job = ReindexJob::new("logstash-20190801", "logstash-2019.08.01");
        assert_eq!(job.source_index(), "logstash-2019.08.01-base");
    }
}
