//! # System Constants
//!
//! Operational boundaries of the migration pipeline: queue names, the working
//! copy suffix convention, poll cadences, and sizing defaults.

use std::time::Duration;

/// Durable queue/topic names on the pgmq transport
pub mod queues {
    /// Serialized snapshot/restore operations (single consumer: the manager)
    pub const SNAPSHOT_OPS: &str = "snapshot_ops";
    /// Parallel reindex operations (N consumers)
    pub const REINDEX_OPS: &str = "reindex_ops";
    /// Ordered backlog of not-yet-restored archive entries (the snaplist)
    pub const PENDING_SNAPSHOTS: &str = "pending_snapshots";
}

/// Suffix appended to an index name to form its restored working copy
pub const WORKING_COPY_SUFFIX: &str = "-base";

/// Rename pattern applied on snapshot restore: the whole index name
pub const RESTORE_RENAME_PATTERN: &str = "^(.*)$";

/// Rename replacement applied on snapshot restore: `{index}-base`
pub const RESTORE_RENAME_REPLACEMENT: &str = "$1-base";

/// Cadence for snapshot create/restore status polls (no timeout, no backoff)
pub const SNAPSHOT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence for cluster health polls while waiting for green
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence for async reindex task status polls
pub const TASK_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Cadence for queue reads when a worker is idle or paused
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default target size for a single primary shard (50 GiB)
pub const DEFAULT_SHARD_TARGET_BYTES: u64 = 50 * 1024 * 1024 * 1024;

/// Engine default for the per-index field count limit
pub const DEFAULT_FIELD_LIMIT: u64 = 1000;

/// Headroom kept between the merged field count and the configured limit
pub const FIELD_LIMIT_HEADROOM: u64 = 100;

/// Single document type name enforced on migrated indexes
pub const SINGLE_TYPE_NAME: &str = "_doc";

/// Build the working copy name for a source index
pub fn working_copy(index: &str) -> String {
    format!("{index}{WORKING_COPY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_copy_suffix() {
        assert_eq!(working_copy("logstash-2019.08.01"), "logstash-2019.08.01-base");
    }
}
