//! # Pipeline Bootstrap
//!
//! Operator-facing entry points around the queues: seeding the backlog from
//! the archive listing, priming the pipe, queue depth reporting, direct
//! injection for crash recovery, and topic cleanup.

use regex::Regex;
use tracing::{info, warn};

use crate::cluster::{ClusterClient, SnapshotInfo, SnapshotState};
use crate::constants::queues;
use crate::error::Result;
use crate::messaging::{ReindexJob, SnapshotJob, SnapshotRecord, WorkQueue};

/// Queue depth report for the `status` command
#[derive(Debug, Clone, Copy)]
pub struct QueueDepths {
    pub snapshot_ops: i64,
    pub reindex_ops: i64,
    pub backlog: i64,
}

/// Backlog seeding and operator control surface
pub struct PipelineBootstrap<Q, C> {
    queue: Q,
    cluster: C,
    repository: String,
    name_pattern: Regex,
}

/// Filter an archive listing down to migratable records: name matches the
/// operator pattern, snapshot completed successfully, and it contains exactly
/// one index
pub fn filter_archive(entries: Vec<SnapshotInfo>, pattern: &Regex) -> Vec<SnapshotRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            if entry.state != SnapshotState::Success {
                return None;
            }
            if !pattern.is_match(&entry.snapshot) {
                return None;
            }
            match entry.indices.as_slice() {
                [index] => Some(SnapshotRecord::new(entry.snapshot.clone(), index.clone())),
                _ => None,
            }
        })
        .collect()
}

impl<Q, C> PipelineBootstrap<Q, C>
where
    Q: WorkQueue,
    C: ClusterClient,
{
    pub fn new(queue: Q, cluster: C, repository: impl Into<String>, name_pattern: Regex) -> Self {
        Self {
            queue,
            cluster,
            repository: repository.into(),
            name_pattern,
        }
    }

    /// Seed the backlog from the archive listing.
    ///
    /// Records are pushed in ascending name order so the FIFO backlog pops
    /// oldest-first, bounding how stale the oldest unmigrated archive entry
    /// can get.
    pub async fn seed(&self) -> Result<usize> {
        let listing = self.cluster.list_snapshots(&self.repository).await?;
        let total = listing.len();

        let mut records = filter_archive(listing, &self.name_pattern);
        records.sort_by(|a, b| a.snapshot.cmp(&b.snapshot));

        for record in &records {
            self.queue.backlog_push(record).await?;
        }

        info!(
            repository = %self.repository,
            archive_entries = total,
            seeded = records.len(),
            "🌱 BOOTSTRAP: Backlog seeded"
        );
        Ok(records.len())
    }

    /// Prime the pipe: pop up to `count` backlog records and submit one
    /// restore job each. `count` should equal the reindex worker concurrency.
    pub async fn prime(&self, count: usize) -> Result<usize> {
        let mut primed = 0;
        for _ in 0..count {
            match self.queue.backlog_pop_front().await? {
                Some(record) => {
                    self.queue
                        .push_snapshot_job(&SnapshotJob::restore(record))
                        .await?;
                    primed += 1;
                }
                None => break,
            }
        }

        info!(requested = count, primed, "🚰 BOOTSTRAP: Pipe primed");
        Ok(primed)
    }

    /// Direct-inject recovery for a pair left inconsistent by a crash.
    ///
    /// Deletes the stale, partially-reindexed target and re-enqueues the
    /// mutate+reindex+snapshot cycle for the existing `-base` working copy,
    /// bypassing the backlog. With `from_restore` the working copy itself is
    /// gone too and the cycle re-starts from the restore action instead.
    pub async fn inject(&self, snapshot: &str, index: &str, from_restore: bool) -> Result<()> {
        warn!(
            snapshot = %snapshot,
            index = %index,
            from_restore,
            "🚑 BOOTSTRAP: Direct-injecting recovery cycle"
        );

        if from_restore {
            self.queue
                .push_snapshot_job(&SnapshotJob::restore(SnapshotRecord::new(snapshot, index)))
                .await?;
        } else {
            self.cluster.delete_index(index).await?;
            self.queue
                .push_reindex_job(&ReindexJob::new(snapshot, index))
                .await?;
        }
        Ok(())
    }

    /// Zero both job topics. The backlog is deliberately left alone.
    pub async fn purge_topics(&self) -> Result<(u64, u64)> {
        let snapshot_ops = self.queue.purge(queues::SNAPSHOT_OPS).await?;
        let reindex_ops = self.queue.purge(queues::REINDEX_OPS).await?;
        Ok((snapshot_ops, reindex_ops))
    }

    /// Depths of both job topics and the backlog
    pub async fn queue_depths(&self) -> Result<QueueDepths> {
        Ok(QueueDepths {
            snapshot_ops: self.queue.size(queues::SNAPSHOT_OPS).await?,
            reindex_ops: self.queue.size(queues::REINDEX_OPS).await?,
            backlog: self.queue.backlog_size().await?,
        })
    }
}
