//! # Worker Control Surface
//!
//! Cooperative pause/resume/stop for the worker loops. Commands arrive
//! outside the queue (process signals, embedding code), workers observe them
//! between jobs: an in-flight job always runs to completion because no
//! cluster operation is cancellable once started.

use tokio::sync::watch;
use tracing::info;

/// Command currently in effect for a worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Accept and process jobs
    Run,
    /// Finish the current job, then stop accepting new ones
    Pause,
    /// Finish the current job, then terminate the loop
    Stop,
}

/// Sending half of the control surface, held by the supervisor
#[derive(Debug, Clone)]
pub struct WorkerControl {
    tx: watch::Sender<WorkerCommand>,
}

/// Receiving half, held by a worker loop
#[derive(Debug, Clone)]
pub struct WorkerSignal {
    rx: watch::Receiver<WorkerCommand>,
}

impl WorkerControl {
    /// Create a control pair starting in the `Run` state
    pub fn new() -> (Self, WorkerSignal) {
        let (tx, rx) = watch::channel(WorkerCommand::Run);
        (Self { tx }, WorkerSignal { rx })
    }

    pub fn pause(&self) {
        info!("⏸️ Worker pause requested");
        let _ = self.tx.send(WorkerCommand::Pause);
    }

    pub fn resume(&self) {
        info!("▶️ Worker resume requested");
        let _ = self.tx.send(WorkerCommand::Run);
    }

    pub fn stop(&self) {
        info!("🛑 Worker stop requested");
        let _ = self.tx.send(WorkerCommand::Stop);
    }
}

impl WorkerSignal {
    /// Command currently in effect
    pub fn current(&self) -> WorkerCommand {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_control_transitions() {
        let (control, signal) = WorkerControl::new();
        assert_eq!(signal.current(), WorkerCommand::Run);

        control.pause();
        assert_eq!(signal.current(), WorkerCommand::Pause);

        control.resume();
        assert_eq!(signal.current(), WorkerCommand::Run);

        control.stop();
        assert_eq!(signal.current(), WorkerCommand::Stop);
    }

    #[tokio::test]
    async fn test_signal_is_cloneable_across_workers() {
        let (control, signal) = WorkerControl::new();
        let second = signal.clone();

        control.stop();
        assert_eq!(signal.current(), WorkerCommand::Stop);
        assert_eq!(second.current(), WorkerCommand::Stop);
    }
}
