//! # Pipeline Orchestration
//!
//! The two cooperating worker roles and their supporting pieces. The
//! [`SnapshotManager`] is a singleton; [`ReindexWorker`]s form a pool. They
//! alternately hand a single logical token of work back and forth
//! (restore → reindex → snapshot → restore...), with the reindex worker
//! additionally injecting a fresh backlog-driven restore job on every
//! completion — that is what keeps N workers continuously fed.

pub mod bootstrap;
pub mod clock;
pub mod control;
pub mod reindex_worker;
pub mod snapshot_manager;
pub mod transform;

pub use bootstrap::{filter_archive, PipelineBootstrap, QueueDepths};
pub use clock::{PollClock, TokioClock};
pub use control::{WorkerCommand, WorkerControl, WorkerSignal};
pub use reindex_worker::{ReindexSettings, ReindexWorker};
pub use snapshot_manager::SnapshotManager;
pub use transform::{
    primary_store_bytes, replica_count, shard_count, single_type_script, MappingTransform,
    SingleTypeTransform, TargetIndexSpec, TransformContext,
};
