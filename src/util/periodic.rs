//! Periodic tasks with supervised failures
//!
//! Each driver (physics, decisions) is a `PeriodicJob` fired on its own tokio
//! interval. A failing firing never stops the task; the error is forwarded to
//! the supervisor channel and the next firing proceeds as usual.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::SimError;
use crate::metrics::Metrics;

/// Something fired on a fixed period
pub trait PeriodicJob: Send + 'static {
    fn name(&self) -> &'static str;

    fn fire(&mut self) -> impl Future<Output = Result<(), SimError>> + Send;
}

/// A failed firing, as seen by the supervisor
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: &'static str,
    /// 1-based firing number
    pub firing: u64,
    pub error: SimError,
}

/// Spawn `job` on a tokio interval. The first firing happens immediately.
pub fn spawn_periodic<J: PeriodicJob>(
    mut job: J,
    period: Duration,
    missed: MissedTickBehavior,
    failures: mpsc::UnboundedSender<TaskFailure>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(missed);
        let mut firing = 0u64;

        debug!("Periodic task '{}' started ({:?})", job.name(), period);

        loop {
            interval.tick().await;
            firing += 1;

            if let Err(error) = job.fire().await {
                let failure = TaskFailure {
                    task: job.name(),
                    firing,
                    error,
                };
                // Supervisor gone means shutdown; keep firing regardless
                let _ = failures.send(failure);
            }
        }
    })
}

/// Log and count failures until every sender is dropped
pub async fn supervise(mut failures: mpsc::UnboundedReceiver<TaskFailure>, metrics: Arc<Metrics>) {
    while let Some(failure) = failures.recv().await {
        metrics.task_failures.fetch_add(1, Ordering::Relaxed);
        warn!(
            "Task '{}' firing {} failed: {}",
            failure.task, failure.firing, failure.error
        );
    }
    debug!("Supervisor stopped: no tasks left");
}
