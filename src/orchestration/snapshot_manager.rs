//! # Snapshot Manager
//!
//! The serialized half of the pipeline. Consumes `snapshot_ops` jobs one at a
//! time and never concurrently: the engine rejects concurrent snapshot
//! operations cluster-wide, so exactly one manager instance may run.
//!
//! **Operational invariant, not software-enforced**: nothing in this code
//! takes a lock or lease. Deployments guarantee a single active consumer of
//! the `snapshot_ops` topic by never starting a second manager process; a
//! second instance would fail loudly on its first snapshot call rather than
//! corrupt state.
//!
//! State machine per job:
//! - restore: `Idle → Restoring → WaitSnapshot → WaitHealth → emit ReindexJob → Idle`
//! - snapshot: `Idle → Snapshotting → WaitSnapshot → Cleanup → Idle`

use tracing::{debug, error, info, warn};

use super::clock::PollClock;
use super::control::{WorkerCommand, WorkerSignal};
use crate::cluster::{ClusterClient, ClusterHealth, SnapshotState};
use crate::constants::{
    working_copy, HEALTH_POLL_INTERVAL, QUEUE_POLL_INTERVAL, RESTORE_RENAME_PATTERN,
    RESTORE_RENAME_REPLACEMENT, SNAPSHOT_POLL_INTERVAL,
};
use crate::error::Result;
use crate::messaging::{ReindexJob, SnapshotAction, SnapshotJob, WorkQueue};

/// Singleton manager role for snapshot and restore operations
pub struct SnapshotManager<Q, C, K> {
    queue: Q,
    cluster: C,
    clock: K,
    repository: String,
}

impl<Q, C, K> SnapshotManager<Q, C, K>
where
    Q: WorkQueue,
    C: ClusterClient,
    K: PollClock,
{
    pub fn new(queue: Q, cluster: C, clock: K, repository: impl Into<String>) -> Self {
        Self {
            queue,
            cluster,
            clock,
            repository: repository.into(),
        }
    }

    /// Job-processing loop: one snapshot-ops job at a time until stopped.
    ///
    /// A failed job is logged and dropped, never retried; the affected index
    /// pair stays behind for operator recovery via `inject`.
    pub async fn run(&self, signal: WorkerSignal) -> Result<()> {
        info!(repository = %self.repository, "🚀 SNAPSHOT MANAGER: Starting job loop");

        loop {
            match signal.current() {
                WorkerCommand::Stop => break,
                WorkerCommand::Pause => {
                    self.clock.sleep(QUEUE_POLL_INTERVAL).await;
                    continue;
                }
                WorkerCommand::Run => {}
            }

            match self.queue.try_pop_snapshot_job().await? {
                Some(job) => {
                    if let Err(e) = self.handle(&job).await {
                        error!(
                            action = ?job.action,
                            snapshot = %job.snapshot,
                            index = %job.index,
                            error = %e,
                            "❌ SNAPSHOT MANAGER: Job failed; pair left for operator recovery"
                        );
                    }
                }
                None => self.clock.sleep(QUEUE_POLL_INTERVAL).await,
            }
        }

        info!("🛑 SNAPSHOT MANAGER: Job loop stopped");
        Ok(())
    }

    /// Process a single snapshot-ops job
    pub async fn handle(&self, job: &SnapshotJob) -> Result<()> {
        match job.action {
            SnapshotAction::Restore => self.restore(&job.snapshot, &job.index).await,
            SnapshotAction::Snapshot => self.snapshot(&job.snapshot, &job.index).await,
        }
    }

    /// Restore an archive snapshot into its `-base` working copy, wait for
    /// the cluster to go green, then hand the pair to the reindex pool
    async fn restore(&self, snapshot: &str, index: &str) -> Result<()> {
        info!(
            snapshot = %snapshot,
            index = %index,
            working_copy = %working_copy(index),
            "♻️ SNAPSHOT MANAGER: Restoring"
        );

        self.cluster
            .snapshot_restore(
                &self.repository,
                snapshot,
                RESTORE_RENAME_PATTERN,
                RESTORE_RENAME_REPLACEMENT,
            )
            .await?;

        self.wait_for_snapshot_success(snapshot).await?;
        self.wait_for_green().await?;

        self.queue
            .push_reindex_job(&ReindexJob::new(snapshot, index))
            .await?;

        info!(snapshot = %snapshot, index = %index, "✅ SNAPSHOT MANAGER: Restore complete, reindex job emitted");
        Ok(())
    }

    /// Archive a finished target index into a fresh snapshot, then delete
    /// the working pair. No job is emitted afterwards: the cycle is driven
    /// forward by the reindex worker, not the manager.
    async fn snapshot(&self, snapshot: &str, index: &str) -> Result<()> {
        info!(snapshot = %snapshot, index = %index, "📦 SNAPSHOT MANAGER: Snapshotting");

        // A same-name snapshot only exists on a re-run; absence is the
        // common case, so failure here is logged and swallowed
        if let Err(e) = self.cluster.snapshot_delete(&self.repository, snapshot).await {
            warn!(
                snapshot = %snapshot,
                error = %e,
                "Pre-existing snapshot delete failed (expected on first run)"
            );
        }

        self.cluster
            .snapshot_create(&self.repository, snapshot, index)
            .await?;
        self.wait_for_snapshot_success(snapshot).await?;

        // Idempotent deletes: a prior partial run may have removed either one
        self.cluster.delete_index(index).await?;
        self.cluster.delete_index(&working_copy(index)).await?;

        info!(snapshot = %snapshot, index = %index, "✅ SNAPSHOT MANAGER: Snapshot complete, pair deleted");
        Ok(())
    }

    /// Poll snapshot state every 5s until `SUCCESS`. No timeout, no backoff:
    /// a snapshot that never completes is an operator problem.
    async fn wait_for_snapshot_success(&self, snapshot: &str) -> Result<()> {
        loop {
            match self
                .cluster
                .snapshot_status(&self.repository, snapshot)
                .await?
            {
                SnapshotState::Success => return Ok(()),
                state @ (SnapshotState::Failed | SnapshotState::Partial | SnapshotState::Incompatible) => {
                    warn!(snapshot = %snapshot, state = ?state, "Snapshot in terminal non-success state; still waiting for operator");
                }
                state => {
                    debug!(snapshot = %snapshot, state = ?state, "Waiting for snapshot SUCCESS");
                }
            }
            self.clock.sleep(SNAPSHOT_POLL_INTERVAL).await;
        }
    }

    /// Poll cluster health every 5s until green (replicas caught up)
    async fn wait_for_green(&self) -> Result<()> {
        loop {
            match self.cluster.health().await? {
                ClusterHealth::Green => return Ok(()),
                health => {
                    debug!(health = ?health, "Waiting for cluster green");
                }
            }
            self.clock.sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::SnapshotState;
    use crate::constants::queues;
    use crate::messaging::{InMemoryWorkQueue, SnapshotRecord};
    use crate::test_helpers::{FakeCluster, IndexFixture, NoopClock};

    fn manager(
        queue: InMemoryWorkQueue,
        cluster: FakeCluster,
    ) -> SnapshotManager<InMemoryWorkQueue, FakeCluster, NoopClock> {
        SnapshotManager::new(queue, cluster, NoopClock, "archive")
    }

    #[tokio::test]
    async fn test_restore_creates_working_copy_and_emits_reindex_job() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();
        cluster.add_archive_snapshot(
            "logstash-20190801",
            SnapshotState::Success,
            &["logstash-2019.08.01"],
        );
        cluster.add_fixture("logstash-2019.08.01", IndexFixture::default());
        cluster.script_health(&[ClusterHealth::Yellow, ClusterHealth::Green]);

        let manager = manager(queue.clone(), cluster.clone());
        let job = SnapshotJob::restore(SnapshotRecord::new(
            "logstash-20190801",
            "logstash-2019.08.01",
        ));
        manager.handle(&job).await.expect("restore should succeed");

        assert!(cluster.has_index("logstash-2019.08.01-base"));

        let reindex = queue
            .try_pop_reindex_job()
            .await
            .unwrap()
            .expect("reindex job emitted");
        assert_eq!(reindex.snapshot, "logstash-20190801");
        assert_eq!(reindex.index, "logstash-2019.08.01");
        assert_eq!(queue.size(queues::REINDEX_OPS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_replaces_archive_entry_and_deletes_pair() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();
        // The archive entry the pair was restored from still exists
        cluster.add_archive_snapshot(
            "logstash-20190801",
            SnapshotState::Success,
            &["logstash-2019.08.01"],
        );

        let manager = manager(queue.clone(), cluster.clone());
        let job = SnapshotJob::snapshot("logstash-20190801", "logstash-2019.08.01");
        manager.handle(&job).await.expect("snapshot should succeed");

        // Old entry deleted, new one archives the target index
        assert_eq!(cluster.deleted_snapshots(), vec!["logstash-20190801"]);
        let archived = cluster.snapshot_in_repo("logstash-20190801").expect("snapshot");
        assert_eq!(archived.indices, vec!["logstash-2019.08.01"]);

        // Both halves of the pair deleted even though neither was live
        assert_eq!(
            cluster.deleted_indexes(),
            vec!["logstash-2019.08.01", "logstash-2019.08.01-base"]
        );

        // The manager never emits after a snapshot action
        assert_eq!(queue.size(queues::SNAPSHOT_OPS).await.unwrap(), 0);
        assert_eq!(queue.size(queues::REINDEX_OPS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prior_snapshot_absence_is_swallowed() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();

        let manager = manager(queue, cluster.clone());
        let job = SnapshotJob::snapshot("fresh-snapshot", "some-index");
        // snapshot_delete fails with 404 here; the action must still succeed
        manager.handle(&job).await.expect("snapshot should succeed");

        assert!(cluster.snapshot_in_repo("fresh-snapshot").is_some());
    }
}
