//! Perpetual task scheduling.

use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// How the sleep between invocations accounts for the run's own duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// Subtract the runtime from the sleep, keeping the wall-clock period
    /// between starts fixed. A run slower than the interval reruns
    /// immediately.
    PerInvocation,

    /// Always sleep the full interval after a run.
    AfterRun,
}

/// A named unit of work invoked on a schedule until stopped.
///
/// Shared resources are cloned into the task at construction; task-local
/// resources (like a store gateway and its single database connection) are
/// owned by it. The stop token is the one the runner sleeps on, so bodies
/// can break out of long inner loops cooperatively.
#[async_trait]
pub trait PerpetualTask: Send + 'static {
    async fn execute(&mut self, stop: &CancellationToken) -> Result<(), TaskError>;
}

/// Supervises a set of perpetual tasks under one root stop token.
///
/// A fatal error in any task cancels the root token, which both stops every
/// sibling task and lets the process supervisor observe the failure.
pub struct TaskRunner {
    shutdown: CancellationToken,
    workers: Vec<Worker>,
}

struct Worker {
    id: String,
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            workers: Vec::new(),
        }
    }

    /// Token that is cancelled when any task fails fatally.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start one worker driving `task` on `interval`.
    pub fn spawn<T: PerpetualTask>(
        &mut self,
        id: &str,
        interval: Duration,
        mode: TimingMode,
        task: T,
    ) {
        let stop = self.shutdown.child_token();

        let handle = tokio::spawn(run_task(
            id.to_string(),
            interval,
            mode,
            task,
            stop.clone(),
            self.shutdown.clone(),
        ));

        self.workers.push(Worker {
            id: id.to_string(),
            stop,
            handle,
        });
    }

    /// Request every task to stop, then wait for all workers to exit.
    pub async fn shutdown(self) {
        for worker in &self.workers {
            worker.stop.cancel();
        }

        for worker in self.workers {
            if let Err(err) = worker.handle.await {
                error!("[{}] worker panicked: {err}", worker.id);
            }
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_task<T: PerpetualTask>(
    id: String,
    interval: Duration,
    mode: TimingMode,
    mut task: T,
    stop: CancellationToken,
    shutdown: CancellationToken,
) {
    // Run until a stop is requested
    while !stop.is_cancelled() {
        info!("[{id}] running");

        let begin = Instant::now();
        if let Err(err) = task.execute(&stop).await {
            error!("[{id}] {err}");

            // Fatal, take the whole process down
            shutdown.cancel();
            return;
        }
        let end = Instant::now();
        let elapsed = end - begin;

        // Exit immediately if stop requested
        if stop.is_cancelled() {
            break;
        }

        // Adjust target wake time
        let mut next_wake = end + interval;
        if mode == TimingMode::PerInvocation {
            next_wake = next_wake.checked_sub(elapsed).unwrap_or(end);
        }

        let now = Instant::now();
        if next_wake <= now {
            info!("[{id}] re-running immediately");
            continue;
        }

        info!(
            "[{id}] finished in {elapsed:?}, next run in {:?}",
            next_wake - now
        );

        // Sleep until next wake, or until stop requested
        tokio::select! {
            () = stop.cancelled() => break,
            () = time::sleep_until(next_wake) => {}
        }
    }

    info!("[{id}] stop requested");
}
