//! # pgmq Work Queue
//!
//! Production [`WorkQueue`] transport on pgmq (PostgreSQL message queue).
//! Topics and the backlog are pgmq queues; `pop` uses pgmq's
//! read-and-delete pop so a message is delivered to exactly one consumer,
//! and the backlog inherits pgmq's FIFO-by-insertion visibility order.

use async_trait::async_trait;
use pgmq::PGMQueue;
use tracing::{debug, info, warn};

use super::errors::{QueueError, QueueResult};
use super::messages::SnapshotRecord;
use super::WorkQueue;
use crate::constants::{queues, QUEUE_POLL_INTERVAL};

/// pgmq-backed work queue
#[derive(Debug, Clone)]
pub struct PgmqWorkQueue {
    pgmq: PGMQueue,
}

impl PgmqWorkQueue {
    /// Create a new queue client from a connection string
    pub async fn new(database_url: &str) -> QueueResult<Self> {
        info!("🚀 Connecting to pgmq queue transport");

        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| QueueError::connection(e.to_string()))?;

        info!("✅ Connected to pgmq queue transport");
        Ok(Self { pgmq })
    }

    /// Create a new queue client from an existing connection pool
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        info!("🚀 Creating pgmq queue client with shared connection pool");
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq }
    }

    /// Create the two job topics and the backlog list if they do not exist
    pub async fn ensure_queues(&self) -> QueueResult<()> {
        for queue_name in [
            queues::SNAPSHOT_OPS,
            queues::REINDEX_OPS,
            queues::PENDING_SNAPSHOTS,
        ] {
            debug!("📋 Creating queue: {}", queue_name);
            self.pgmq
                .create(queue_name)
                .await
                .map_err(|e| QueueError::operation(queue_name, "create", e.to_string()))?;
        }
        info!("✅ Pipeline queues ready");
        Ok(())
    }

    /// Get reference to the underlying connection pool
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pgmq.connection
    }

    async fn queue_depth(&self, queue_name: &str) -> QueueResult<i64> {
        let depth: i64 = sqlx::query_scalar("SELECT queue_length FROM pgmq.metrics($1)")
            .bind(queue_name)
            .fetch_one(self.pool())
            .await
            .map_err(|e| QueueError::operation(queue_name, "metrics", e.to_string()))?;
        Ok(depth)
    }
}

#[async_trait]
impl WorkQueue for PgmqWorkQueue {
    async fn push(&self, topic: &str, job: &serde_json::Value) -> QueueResult<i64> {
        let message_id = self
            .pgmq
            .send(topic, job)
            .await
            .map_err(|e| QueueError::operation(topic, "send", e.to_string()))?;

        debug!("📤 Message {} sent to queue: {}", message_id, topic);
        Ok(message_id)
    }

    async fn pop(&self, topic: &str) -> QueueResult<serde_json::Value> {
        // pgmq has no server-side blocking read; poll at the queue cadence
        loop {
            if let Some(value) = self.try_pop(topic).await? {
                return Ok(value);
            }
            tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
        }
    }

    async fn try_pop(&self, topic: &str) -> QueueResult<Option<serde_json::Value>> {
        let message = self
            .pgmq
            .pop::<serde_json::Value>(topic)
            .await
            .map_err(|e| QueueError::operation(topic, "pop", e.to_string()))?;

        match message {
            Some(msg) => {
                debug!("📥 Message {} popped from queue: {}", msg.msg_id, topic);
                Ok(Some(msg.message))
            }
            None => Ok(None),
        }
    }

    async fn backlog_push(&self, record: &SnapshotRecord) -> QueueResult<i64> {
        let value = serde_json::to_value(record)?;
        self.push(queues::PENDING_SNAPSHOTS, &value).await
    }

    async fn backlog_pop_front(&self) -> QueueResult<Option<SnapshotRecord>> {
        match self.try_pop(queues::PENDING_SNAPSHOTS).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn size(&self, topic: &str) -> QueueResult<i64> {
        self.queue_depth(topic).await
    }

    async fn backlog_size(&self) -> QueueResult<i64> {
        self.queue_depth(queues::PENDING_SNAPSHOTS).await
    }

    async fn purge(&self, topic: &str) -> QueueResult<u64> {
        warn!("🧹 Purging queue: {}", topic);

        let purged = self
            .pgmq
            .purge(topic)
            .await
            .map_err(|e| QueueError::operation(topic, "purge", e.to_string()))?;

        warn!("🗑️ Purged {} messages from queue: {}", purged, topic);
        Ok(purged)
    }
}
