//! # Poll Clock
//!
//! The pipeline's wait states are deliberate busy-wait poll loops with no
//! timeout and no backoff: a stuck cluster is fixed by a human, not by the
//! orchestrator. The sleeping side of those loops sits behind [`PollClock`]
//! so tests can inject a clock that does not actually wait.

use async_trait::async_trait;
use std::time::Duration;

/// Injectable sleep for poll loops
#[async_trait]
pub trait PollClock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl PollClock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
