#![allow(clippy::doc_markdown)] // Allow technical terms like Elasticsearch, pgmq in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Reindexer Core
//!
//! Crash-tolerant orchestration pipeline that migrates every snapshot in a
//! search-cluster archive through a schema-mutation + reindex step, one index
//! at a time.
//!
//! ## Architecture
//!
//! Two cooperating worker roles hand a single logical token of work back and
//! forth over durable queues:
//!
//! - **SnapshotManager** (singleton role): consumes `snapshot_ops` jobs one at
//!   a time. A *restore* job restores an archive snapshot into a `-base`
//!   working copy, waits for cluster green, then emits a reindex job. A
//!   *snapshot* job archives a finished target index and deletes the working
//!   pair. The search engine only allows one snapshot operation cluster-wide,
//!   so exactly one manager instance may run — this is an operational
//!   invariant, not software-enforced.
//! - **ReindexWorker** (pool role): consumes `reindex_ops` jobs, applies the
//!   mapping transform, drives an asynchronous reindex task to completion,
//!   then emits a snapshot job and pulls the next backlog entry. Pulling the
//!   backlog on every completion is what keeps N workers continuously fed.
//!
//! The only durable state is the queue transport (pgmq) and the
//! `pending_snapshots` backlog. Everything else is scoped to a single job and
//! discarded on completion or crash; recovery after a hard crash is the
//! operator `inject` command.
//!
//! ## Module Organization
//!
//! - [`messaging`] - WorkQueue abstraction, job messages, pgmq transport
//! - [`cluster`] - Search engine administrative API client
//! - [`orchestration`] - Manager/worker state machines, transform, bootstrap
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`test_helpers`] - In-memory engine double for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reindexer_core::config::ConfigManager;
//! use reindexer_core::messaging::pgmq_queue::PgmqWorkQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config_manager = ConfigManager::load()?;
//! let queue = PgmqWorkQueue::new(&config_manager.config().queue.database_url).await?;
//! queue.ensure_queues().await?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod orchestration;
pub mod test_helpers;

pub use cluster::{ClusterClient, ClusterError, ClusterHealth, SnapshotState};
pub use config::{ConfigManager, PipelineConfig};
pub use error::{PipelineError, Result};
pub use messaging::{QueueError, ReindexJob, SnapshotAction, SnapshotJob, SnapshotRecord, WorkQueue};
pub use orchestration::{
    MappingTransform, PipelineBootstrap, ReindexWorker, SingleTypeTransform, SnapshotManager,
    WorkerCommand, WorkerControl,
};
