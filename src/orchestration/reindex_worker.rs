//! # Reindex Worker
//!
//! The parallel half of the pipeline. Any number of these may run; each is
//! single-threaded in its own job loop and occupied for a job's full
//! duration, poll waits included.
//!
//! State machine per job:
//! `Idle → MappingMutate → Flush → SubmitTask → Polling → emit SnapshotJob →
//! PopBacklog → (emit next RestoreJob | drain) → Idle`
//!
//! The completion handoff is what keeps N workers fed: every finished reindex
//! emits exactly one snapshot job and, while the backlog lasts, exactly one
//! fresh restore job.

use tracing::{debug, error, info};
use uuid::Uuid;

use super::clock::PollClock;
use super::control::{WorkerCommand, WorkerSignal};
use super::transform::{single_type_script, MappingTransform, TargetIndexSpec, TransformContext};
use crate::cluster::ClusterClient;
use crate::config::PipelineSettings;
use crate::constants::{QUEUE_POLL_INTERVAL, TASK_POLL_INTERVAL};
use crate::error::Result;
use crate::messaging::{ReindexJob, SnapshotJob, SnapshotRecord, WorkQueue};

/// Sizing knobs the worker threads through to the transform and the engine
#[derive(Debug, Clone, Copy)]
pub struct ReindexSettings {
    pub shard_target_bytes: u64,
    pub reindex_batch_size: u32,
}

impl From<&PipelineSettings> for ReindexSettings {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            shard_target_bytes: settings.shard_target_bytes,
            reindex_batch_size: settings.reindex_batch_size,
        }
    }
}

/// Pool worker role for mapping mutation and reindex
pub struct ReindexWorker<Q, C, T, K> {
    queue: Q,
    cluster: C,
    transform: T,
    clock: K,
    settings: ReindexSettings,
    worker_id: Uuid,
}

impl<Q, C, T, K> ReindexWorker<Q, C, T, K>
where
    Q: WorkQueue,
    C: ClusterClient,
    T: MappingTransform,
    K: PollClock,
{
    pub fn new(queue: Q, cluster: C, transform: T, clock: K, settings: ReindexSettings) -> Self {
        Self {
            queue,
            cluster,
            transform,
            clock,
            settings,
            worker_id: Uuid::new_v4(),
        }
    }

    /// Job-processing loop: one reindex-ops job at a time until stopped.
    ///
    /// A failed job is logged and dropped, never retried; the affected index
    /// pair stays behind for operator recovery via `inject`.
    pub async fn run(&self, signal: WorkerSignal) -> Result<()> {
        info!(worker_id = %self.worker_id, "🚀 REINDEX WORKER: Starting job loop");

        loop {
            match signal.current() {
                WorkerCommand::Stop => break,
                WorkerCommand::Pause => {
                    self.clock.sleep(QUEUE_POLL_INTERVAL).await;
                    continue;
                }
                WorkerCommand::Run => {}
            }

            match self.queue.try_pop_reindex_job().await? {
                Some(job) => {
                    if let Err(e) = self.process(&job).await {
                        error!(
                            worker_id = %self.worker_id,
                            snapshot = %job.snapshot,
                            index = %job.index,
                            error = %e,
                            "❌ REINDEX WORKER: Job failed; pair left for operator recovery"
                        );
                    }
                }
                None => self.clock.sleep(QUEUE_POLL_INTERVAL).await,
            }
        }

        info!(worker_id = %self.worker_id, "🛑 REINDEX WORKER: Job loop stopped");
        Ok(())
    }

    /// Process one reindex-ops job: mutate, reindex, then hand the token back
    pub async fn process(&self, job: &ReindexJob) -> Result<()> {
        let source = job.source_index();
        let target = &job.index;

        info!(
            worker_id = %self.worker_id,
            source = %source,
            target = %target,
            "🔧 REINDEX WORKER: Processing"
        );

        let spec = self.mutate_mapping(&source, target).await?;
        self.reindex(&source, target, &spec).await?;

        // Handoff: exactly one snapshot job per completed reindex...
        self.queue
            .push_snapshot_job(&SnapshotJob::snapshot(&job.snapshot, &job.index))
            .await?;

        // ...and one fresh restore job while the backlog lasts
        match self.queue.backlog_pop_front().await? {
            Some(record) => {
                info!(
                    worker_id = %self.worker_id,
                    next_snapshot = %record.snapshot,
                    "📥 REINDEX WORKER: Feeding next backlog entry into the pipe"
                );
                self.pull_next(record).await?;
            }
            None => {
                info!(
                    worker_id = %self.worker_id,
                    "🏁 REINDEX WORKER: Backlog empty, pipeline draining"
                );
            }
        }

        info!(worker_id = %self.worker_id, index = %job.index, "✅ REINDEX WORKER: Job complete");
        Ok(())
    }

    /// Test-mode variant: run the mutate+reindex pair against an arbitrary
    /// source/target, with no queue or backlog side effects. Used for
    /// offline validation of the transform logic.
    pub async fn test_cycle(&self, source: &str, target: &str) -> Result<()> {
        info!(source = %source, target = %target, "🧪 REINDEX WORKER: Test cycle");
        let spec = self.mutate_mapping(source, target).await?;
        self.reindex(source, target, &spec).await?;
        info!(target = %target, "✅ REINDEX WORKER: Test cycle complete");
        Ok(())
    }

    /// Delegate schema evolution to the transform and create the target.
    ///
    /// This is the sole point where business-specific mapping logic runs; the
    /// worker only requires that a create-ready target index comes back.
    async fn mutate_mapping(&self, source: &str, target: &str) -> Result<TargetIndexSpec> {
        let mapping = self.cluster.get_mapping(source).await?;
        let settings = self.cluster.get_settings(source).await?;
        let stats = self.cluster.get_stats(source).await?;

        let ctx = TransformContext {
            index: target,
            mapping: &mapping,
            settings: &settings,
            stats,
            shard_target_bytes: self.settings.shard_target_bytes,
        };
        let spec = self.transform.transform(&ctx)?;

        debug!(target = %target, "🆕 Creating target index from transformed mapping");
        self.cluster.create_index(target, &spec.body()).await?;
        Ok(spec)
    }

    /// Flush the source, submit the async reindex task, and poll it to
    /// completion every 10s. No timeout: a stuck task is an operator problem.
    async fn reindex(&self, source: &str, target: &str, spec: &TargetIndexSpec) -> Result<()> {
        // Commit pending deletions from the transform step so segment merges
        // cannot resurrect them during the copy
        self.cluster.flush(source).await?;

        let script = spec.normalize_doc_type.then(single_type_script);
        let handle = self
            .cluster
            .submit_reindex(
                source,
                target,
                self.settings.reindex_batch_size,
                script.as_deref(),
            )
            .await?;

        info!(source = %source, target = %target, task = %handle.0, "⏳ Reindex task submitted");

        loop {
            if self.cluster.poll_task(&handle).await?.completed {
                return Ok(());
            }
            debug!(task = %handle.0, "Waiting for reindex task completion");
            self.clock.sleep(TASK_POLL_INTERVAL).await;
        }
    }

    async fn pull_next(&self, record: SnapshotRecord) -> Result<()> {
        self.queue
            .push_snapshot_job(&SnapshotJob::restore(record))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::queues;
    use crate::messaging::{InMemoryWorkQueue, SnapshotAction};
    use crate::orchestration::transform::SingleTypeTransform;
    use crate::test_helpers::{FakeCluster, IndexFixture, NoopClock};

    fn settings() -> ReindexSettings {
        ReindexSettings {
            shard_target_bytes: 50 * 1024 * 1024 * 1024,
            reindex_batch_size: 1000,
        }
    }

    fn worker(
        queue: InMemoryWorkQueue,
        cluster: FakeCluster,
    ) -> ReindexWorker<InMemoryWorkQueue, FakeCluster, SingleTypeTransform, NoopClock> {
        ReindexWorker::new(queue, cluster, SingleTypeTransform, NoopClock, settings())
    }

    fn stage_working_copy(cluster: &FakeCluster, index: &str) {
        cluster.add_fixture(&crate::constants::working_copy(index), IndexFixture::default());
    }

    #[tokio::test]
    async fn test_completed_job_emits_one_snapshot_and_one_restore() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();
        stage_working_copy(&cluster, "logstash-2019.08.01");
        queue
            .backlog_push(&SnapshotRecord::new("logstash-20190802", "logstash-2019.08.02"))
            .await
            .unwrap();

        let worker = worker(queue.clone(), cluster.clone());
        let job = ReindexJob::new("logstash-20190801", "logstash-2019.08.01");
        worker.process(&job).await.expect("process should succeed");

        // Exactly one snapshot job and exactly one restore job
        assert_eq!(queue.size(queues::SNAPSHOT_OPS).await.unwrap(), 2);
        let snapshot_job = queue.try_pop_snapshot_job().await.unwrap().expect("job");
        assert_eq!(snapshot_job.action, SnapshotAction::Snapshot);
        assert_eq!(snapshot_job.snapshot, "logstash-20190801");
        assert_eq!(snapshot_job.index, "logstash-2019.08.01");

        let restore_job = queue.try_pop_snapshot_job().await.unwrap().expect("job");
        assert_eq!(restore_job.action, SnapshotAction::Restore);
        assert_eq!(restore_job.snapshot, "logstash-20190802");
        assert_eq!(queue.backlog_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_backlog_emits_no_restore() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();
        stage_working_copy(&cluster, "logstash-2019.08.01");

        let worker = worker(queue.clone(), cluster.clone());
        let job = ReindexJob::new("logstash-20190801", "logstash-2019.08.01");
        worker.process(&job).await.expect("process should succeed");

        // Only the snapshot job: the pipeline drains without duplicate work
        assert_eq!(queue.size(queues::SNAPSHOT_OPS).await.unwrap(), 1);
        let snapshot_job = queue.try_pop_snapshot_job().await.unwrap().expect("job");
        assert_eq!(snapshot_job.action, SnapshotAction::Snapshot);
    }

    #[tokio::test]
    async fn test_reindex_flushes_source_before_submitting() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new().with_task_polls(3);
        stage_working_copy(&cluster, "logstash-2019.08.01");

        let worker = worker(queue.clone(), cluster.clone());
        let job = ReindexJob::new("logstash-20190801", "logstash-2019.08.01");
        worker.process(&job).await.expect("process should succeed");

        assert_eq!(cluster.flushed_indexes(), vec!["logstash-2019.08.01-base"]);

        let calls = cluster.reindex_calls();
        assert_eq!(calls.len(), 1);
        let (source, target, script) = &calls[0];
        assert_eq!(source, "logstash-2019.08.01-base");
        assert_eq!(target, "logstash-2019.08.01");
        assert_eq!(script.as_deref(), Some("ctx._type = '_doc'"));

        // Target was created from the transformed mapping
        let body = cluster.created_body("logstash-2019.08.01").expect("created body");
        assert!(body["mappings"]["_doc"]["properties"].is_object());
    }

    #[tokio::test]
    async fn test_test_cycle_never_touches_queues_or_backlog() {
        let queue = InMemoryWorkQueue::new();
        let cluster = FakeCluster::new();
        cluster.add_fixture("staging-source", IndexFixture::default());
        queue
            .backlog_push(&SnapshotRecord::new("snap-x", "index-x"))
            .await
            .unwrap();

        let worker = worker(queue.clone(), cluster.clone());
        worker
            .test_cycle("staging-source", "staging-target")
            .await
            .expect("test cycle should succeed");

        assert!(cluster.has_index("staging-target"));
        assert_eq!(cluster.reindex_calls().len(), 1);

        // No queue or backlog side effects at all
        assert_eq!(queue.size(queues::SNAPSHOT_OPS).await.unwrap(), 0);
        assert_eq!(queue.size(queues::REINDEX_OPS).await.unwrap(), 0);
        assert_eq!(queue.backlog_size().await.unwrap(), 1);
    }
}
