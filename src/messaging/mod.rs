//! # Messaging Layer
//!
//! Thin abstraction over a durable, ordered, multi-producer/multi-consumer
//! job channel with named topics plus the single durable backlog list (the
//! "snaplist"). The production transport is pgmq; an in-memory implementation
//! backs tests and local demos.
//!
//! Delivery is at-least-once per job with load balancing across however many
//! consumers are subscribed to a topic. No global ordering across topics is
//! guaranteed or needed — pipeline correctness rests on the one-token handoff
//! protocol, not on timestamps. The backlog *is* ordered: FIFO by insertion,
//! popped oldest-first.

pub mod errors;
pub mod memory_queue;
pub mod messages;
pub mod pgmq_queue;

pub use errors::{QueueError, QueueResult};
pub use memory_queue::InMemoryWorkQueue;
pub use messages::{JobMetadata, ReindexJob, SnapshotAction, SnapshotJob, SnapshotRecord};
pub use pgmq_queue::PgmqWorkQueue;

use crate::constants::queues;
use async_trait::async_trait;

/// Durable work queue contract shared by the pgmq and in-memory transports.
///
/// `pop` blocks until a job is available and delivers it to exactly one
/// consumer. `backlog_pop_front` never blocks; `None` means the backlog is
/// exhausted, which callers must treat as "no more work", not an error.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue a JSON job on a topic, returning the transport message id
    async fn push(&self, topic: &str, job: &serde_json::Value) -> QueueResult<i64>;

    /// Blocking pop: wait until a job is available on the topic
    async fn pop(&self, topic: &str) -> QueueResult<serde_json::Value>;

    /// Non-blocking pop: `None` when the topic is empty
    async fn try_pop(&self, topic: &str) -> QueueResult<Option<serde_json::Value>>;

    /// Append a record to the back of the backlog list
    async fn backlog_push(&self, record: &SnapshotRecord) -> QueueResult<i64>;

    /// Pop the oldest backlog record; `None` on exhaustion
    async fn backlog_pop_front(&self) -> QueueResult<Option<SnapshotRecord>>;

    /// Current depth of a topic
    async fn size(&self, topic: &str) -> QueueResult<i64>;

    /// Current depth of the backlog list
    async fn backlog_size(&self) -> QueueResult<i64>;

    /// Delete every message on a topic, returning how many were removed
    async fn purge(&self, topic: &str) -> QueueResult<u64>;

    /// Enqueue a snapshot-ops job
    async fn push_snapshot_job(&self, job: &SnapshotJob) -> QueueResult<i64> {
        let value = serde_json::to_value(job)?;
        self.push(queues::SNAPSHOT_OPS, &value).await
    }

    /// Enqueue a reindex-ops job
    async fn push_reindex_job(&self, job: &ReindexJob) -> QueueResult<i64> {
        let value = serde_json::to_value(job)?;
        self.push(queues::REINDEX_OPS, &value).await
    }

    /// Non-blocking pop of the next snapshot-ops job
    async fn try_pop_snapshot_job(&self) -> QueueResult<Option<SnapshotJob>> {
        match self.try_pop(queues::SNAPSHOT_OPS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Non-blocking pop of the next reindex-ops job
    async fn try_pop_reindex_job(&self) -> QueueResult<Option<ReindexJob>> {
        match self.try_pop(queues::REINDEX_OPS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
