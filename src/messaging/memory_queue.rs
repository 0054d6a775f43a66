//! # In-Memory Work Queue
//!
//! [`WorkQueue`] implementation over in-process `VecDeque`s, used by the test
//! suite and local demos. Preserves the transport contract: FIFO per topic,
//! single delivery per message, non-blocking backlog pop.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::errors::QueueResult;
use super::messages::SnapshotRecord;
use super::WorkQueue;
use crate::constants::queues;

/// In-memory queue transport
#[derive(Clone, Default)]
pub struct InMemoryWorkQueue {
    topics: Arc<Mutex<HashMap<String, VecDeque<serde_json::Value>>>>,
    notify: Arc<Notify>,
}

impl InMemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn push(&self, topic: &str, job: &serde_json::Value) -> QueueResult<i64> {
        let mut topics = self.topics.lock().await;
        let queue = topics.entry(topic.to_string()).or_default();
        queue.push_back(job.clone());
        let message_id = queue.len() as i64;
        self.notify.notify_waiters();
        Ok(message_id)
    }

    async fn pop(&self, topic: &str) -> QueueResult<serde_json::Value> {
        loop {
            // Register for wakeup before checking, so a push between the
            // check and the wait is not lost
            let notified = self.notify.notified();
            if let Some(value) = self.try_pop(topic).await? {
                return Ok(value);
            }
            notified.await;
        }
    }

    async fn try_pop(&self, topic: &str) -> QueueResult<Option<serde_json::Value>> {
        let mut topics = self.topics.lock().await;
        Ok(topics.get_mut(topic).and_then(VecDeque::pop_front))
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
        let topics = self.topics.lock().await;
        Ok(topics.get(topic).map_or(0, |q| q.len() as i64))
    }

    async fn backlog_size(&self) -> QueueResult<i64> {
        self.size(queues::PENDING_SNAPSHOTS).await
    }

    async fn purge(&self, topic: &str) -> QueueResult<u64> {
        let mut topics = self.topics.lock().await;
        let purged = topics.get_mut(topic).map_or(0, |q| {
            let count = q.len() as u64;
            q.clear();
            count
        });
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::messages::{SnapshotAction, SnapshotJob};

    #[tokio::test]
    async fn test_fifo_per_topic() {
        let queue = InMemoryWorkQueue::new();
        queue.push("t", &serde_json::json!(1)).await.unwrap();
        queue.push("t", &serde_json::json!(2)).await.unwrap();

        assert_eq!(queue.try_pop("t").await.unwrap(), Some(serde_json::json!(1)));
        assert_eq!(queue.try_pop("t").await.unwrap(), Some(serde_json::json!(2)));
        assert_eq!(queue.try_pop("t").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backlog_pop_front_returns_none_on_empty() {
        let queue = InMemoryWorkQueue::new();
        assert_eq!(queue.backlog_pop_front().await.unwrap(), None);

        let record = SnapshotRecord::new("snap-a", "index-a");
        queue.backlog_push(&record).await.unwrap();
        assert_eq!(queue.backlog_size().await.unwrap(), 1);
        assert_eq!(queue.backlog_pop_front().await.unwrap(), Some(record));
        assert_eq!(queue.backlog_pop_front().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pop_blocks_until_a_push_arrives() {
        let queue = InMemoryWorkQueue::new();
        let consumer = queue.clone();
        let waiting = tokio::spawn(async move { consumer.pop("t").await });

        // Let the consumer reach its wait before the producer runs, so the
        // wakeup path (not just the initial check) is what delivers
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.push("t", &serde_json::json!({"n": 1})).await.unwrap();

        let value = waiting.await.unwrap().unwrap();
        assert_eq!(value, serde_json::json!({"n": 1}));
        assert_eq!(queue.size("t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_typed_helpers_roundtrip() {
        let queue = InMemoryWorkQueue::new();
        let job = SnapshotJob::snapshot("logstash-20190801", "logstash-2019.08.01");
        queue.push_snapshot_job(&job).await.unwrap();

        let popped = queue.try_pop_snapshot_job().await.unwrap().expect("job");
        assert_eq!(popped.action, SnapshotAction::Snapshot);
        assert_eq!(popped.index, "logstash-2019.08.01");
        assert!(queue.try_pop_snapshot_job().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_clears_topic_only() {
        let queue = InMemoryWorkQueue::new();
        queue.push("a", &serde_json::json!(1)).await.unwrap();
        queue.push("b", &serde_json::json!(2)).await.unwrap();

        assert_eq!(queue.purge("a").await.unwrap(), 1);
        assert_eq!(queue.size("a").await.unwrap(), 0);
        assert_eq!(queue.size("b").await.unwrap(), 1);
    }
}
