//! Operator CLI for the snapshot reindex pipeline
//!
//! One binary covers the full lifecycle: seeding the backlog from the archive
//! listing, priming the pipe, running the manager and worker roles, status
//! reporting, and the crash-recovery escape hatches.
//!
//! The long-running roles respond to process signals between jobs:
//! SIGUSR1 pauses, SIGUSR2 resumes, SIGINT/SIGTERM stop after the current job.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use reindexer_core::cluster::HttpClusterClient;
use reindexer_core::config::ConfigManager;
use reindexer_core::logging::init_structured_logging;
use reindexer_core::messaging::PgmqWorkQueue;
use reindexer_core::orchestration::{
    PipelineBootstrap, ReindexSettings, ReindexWorker, SingleTypeTransform, SnapshotManager,
    TokioClock, WorkerControl,
};

#[derive(Parser)]
#[command(name = "reindexer")]
#[command(about = "Snapshot-to-reindex migration pipeline for a search cluster archive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the backlog from the archive listing
    Seed,
    /// Pop backlog entries and submit one restore job each
    Prime {
        /// Number of restore jobs to submit; match the reindex worker count
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Report queue and backlog depths
    Status,
    /// Run the singleton snapshot manager role
    Manager,
    /// Run reindex workers
    Worker {
        /// Worker loops to run in this process
        #[arg(short = 'n', long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Re-enqueue the cycle for an index pair left behind by a crash
    Inject {
        /// Archive snapshot name
        snapshot: String,
        /// Index name inside the snapshot
        index: String,
        /// Restart from the restore step instead of the reindex step
        #[arg(long)]
        from_restore: bool,
    },
    /// Drop all pending jobs from both job topics (backlog is kept)
    Purge,
    /// Run one mutate+reindex cycle against an arbitrary index pair,
    /// without touching the queues
    TestCycle {
        /// Source index to read from
        source: String,
        /// Target index to create and fill
        target: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let manager = ConfigManager::load().context("failed to load configuration")?;
    let config = manager.config();
    info!(
        environment = %manager.environment(),
        config = %manager.config_path().display(),
        "🚀 REINDEXER: Starting"
    );

    let queue = PgmqWorkQueue::new(&config.queue.database_url)
        .await
        .context("failed to connect to queue transport")?;
    queue
        .ensure_queues()
        .await
        .context("failed to create pipeline queues")?;
    let cluster = HttpClusterClient::new(&config.cluster);

    match cli.command {
        Commands::Seed => {
            let bootstrap = PipelineBootstrap::new(
                queue,
                cluster,
                config.cluster.repository.clone(),
                config.name_pattern()?,
            );
            let seeded = bootstrap.seed().await?;
            println!("Seeded {seeded} snapshot(s) into the backlog");
        }
        Commands::Prime { count } => {
            let bootstrap = PipelineBootstrap::new(
                queue,
                cluster,
                config.cluster.repository.clone(),
                config.name_pattern()?,
            );
            let primed = bootstrap.prime(count).await?;
            println!("Primed {primed} restore job(s)");
        }
        Commands::Status => {
            let bootstrap = PipelineBootstrap::new(
                queue,
                cluster,
                config.cluster.repository.clone(),
                config.name_pattern()?,
            );
            let depths = bootstrap.queue_depths().await?;
            println!("snapshot_ops:       {}", depths.snapshot_ops);
            println!("reindex_ops:        {}", depths.reindex_ops);
            println!("pending_snapshots:  {}", depths.backlog);
        }
        Commands::Manager => {
            let (control, signal) = WorkerControl::new();
            spawn_signal_listener(control)?;

            let manager = SnapshotManager::new(
                queue,
                cluster,
                TokioClock,
                config.cluster.repository.clone(),
            );
            manager.run(signal).await?;
        }
        Commands::Worker { concurrency } => {
            let (control, signal) = WorkerControl::new();
            spawn_signal_listener(control)?;

            let settings = ReindexSettings::from(&config.pipeline);
            let mut handles = Vec::with_capacity(concurrency);
            for _ in 0..concurrency {
                let worker = ReindexWorker::new(
                    queue.clone(),
                    HttpClusterClient::new(&config.cluster),
                    SingleTypeTransform,
                    TokioClock,
                    settings,
                );
                let signal = signal.clone();
                handles.push(tokio::spawn(async move { worker.run(signal).await }));
            }
            for result in futures::future::try_join_all(handles).await? {
                result?;
            }
        }
        Commands::Inject {
            snapshot,
            index,
            from_restore,
        } => {
            let bootstrap = PipelineBootstrap::new(
                queue,
                cluster,
                config.cluster.repository.clone(),
                config.name_pattern()?,
            );
            bootstrap.inject(&snapshot, &index, from_restore).await?;
            println!("Injected recovery cycle for {snapshot} / {index}");
        }
        Commands::Purge => {
            let bootstrap = PipelineBootstrap::new(
                queue,
                cluster,
                config.cluster.repository.clone(),
                config.name_pattern()?,
            );
            let (snapshot_ops, reindex_ops) = bootstrap.purge_topics().await?;
            println!("Purged {snapshot_ops} snapshot-ops and {reindex_ops} reindex-ops job(s)");
        }
        Commands::TestCycle { source, target } => {
            let worker = ReindexWorker::new(
                queue,
                cluster,
                SingleTypeTransform,
                TokioClock,
                ReindexSettings::from(&config.pipeline),
            );
            worker.test_cycle(&source, &target).await?;
            println!("Test cycle complete: {source} -> {target}");
        }
    }

    Ok(())
}

/// Forward process signals to the worker control surface.
///
/// The listener runs for the life of the process; stop is delivered through
/// the control channel, the loop itself is reaped at process exit.
fn spawn_signal_listener(control: WorkerControl) -> anyhow::Result<()> {
    let mut pause = signal(SignalKind::user_defined1()).context("installing SIGUSR1 handler")?;
    let mut resume = signal(SignalKind::user_defined2()).context("installing SIGUSR2 handler")?;
    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = pause.recv() => control.pause(),
                _ = resume.recv() => control.resume(),
                _ = interrupt.recv() => control.stop(),
                _ = terminate.recv() => control.stop(),
            }
        }
    });
    Ok(())
}
