//! Background task management
//!
//! Registration, panic capture and shutdown for every long-running task.
//!
//! # Task kinds
//!
//! - [`TaskKind::Worker`] - long-lived worker
//! - [`TaskKind::Listener`] - domain event listener
//! - [`TaskKind::Periodic`] - timer-driven sweep

use crate::eta::EtaEstimator;
use crate::jobs::JobsManager;
use futures::FutureExt;
use shared::job::DomainEvent;
use shared::util::now_millis;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Worker,
    Listener,
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Worker => write!(f, "Worker"),
            TaskKind::Listener => write!(f, "Listener"),
            TaskKind::Periodic => write!(f, "Periodic"),
        }
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Background task registry
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("offer_sweeper", TaskKind::Periodic, async move {
///     // loop until token.cancelled()
/// });
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token tasks watch for the shutdown signal
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn and register a task
    ///
    /// Panics are caught and logged; a task returning before shutdown is
    /// logged as unexpected.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.clone();
        let wrapped_future = async move {
            let result: Result<(), Box<dyn std::any::Any + Send>> =
                AssertUnwindSafe(future).catch_unwind().await;
            match result {
                Ok(()) if token.is_cancelled() => {}
                Ok(()) => {
                    tracing::warn!(task = %name, kind = %kind, "Background task completed unexpectedly");
                }
                Err(panic_info) => {
                    let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    tracing::error!(
                        task = %name,
                        kind = %kind,
                        panic = %panic_msg,
                        "Background task panicked"
                    );
                }
            }
        };

        let handle = tokio::spawn(wrapped_future);
        tracing::debug!(task = %name, kind = %kind, "Registered background task");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let count = |kind| self.tasks.iter().filter(|t| t.kind == kind).count();
        tracing::info!(
            "Background tasks registered: {} total (Worker: {}, Listener: {}, Periodic: {})",
            self.tasks.len(),
            count(TaskKind::Worker),
            count(TaskKind::Listener),
            count(TaskKind::Periodic),
        );
    }

    /// Number of tasks that have already stopped
    pub fn check_health(&self) -> usize {
        let failed: Vec<_> = self
            .tasks
            .iter()
            .filter(|task| task.handle.is_finished())
            .collect();
        for task in &failed {
            tracing::error!(task = %task.name, kind = %task.kind, "Background task is not running");
        }
        failed.len()
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(self) {
        tracing::info!("Shutting down {} background tasks...", self.tasks.len());
        self.shutdown.cancel();

        for task in self.tasks {
            match task.handle.await {
                Ok(()) => tracing::debug!(task = %task.name, "Task completed"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = %task.name, "Task cancelled"),
                Err(e) => tracing::error!(task = %task.name, error = ?e, "Task panicked"),
            }
        }

        tracing::info!("All background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

/// Expire offers past their deadline every `interval`
pub async fn run_offer_sweeper(
    jobs: Arc<JobsManager>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                match jobs.expire_offers(now_millis()) {
                    Ok(expired) if !expired.is_empty() => {
                        tracing::info!(count = expired.len(), job_ids = ?expired, "Expired stale offers");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Offer sweep failed"),
                }
            }
        }
    }
}

/// Log domain events and drop ETA state for jobs that stop travelling
pub async fn run_event_listener(
    mut events: broadcast::Receiver<DomainEvent>,
    estimator: Arc<EtaEstimator>,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            received = events.recv() => received,
        };

        match event {
            Ok(event) => handle_event(&event, &estimator),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event listener lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn handle_event(event: &DomainEvent, estimator: &EtaEstimator) {
    match event {
        DomainEvent::StatusChanged {
            job_id,
            ticket_id,
            from,
            to,
            actor_id,
            ..
        } => {
            tracing::info!(
                job_id,
                ticket_id,
                from = ?from,
                to = %to,
                actor = %actor_id,
                "Job status changed"
            );
            if !to.is_in_transit() {
                estimator.forget(*job_id);
            }
        }
        DomainEvent::NeedsManualEta { job_id, .. } => {
            tracing::warn!(job_id, "Technician should enter a manual ETA");
        }
        other => {
            tracing::debug!(job_id = other.job_id(), event = other.name(), "Domain event");
        }
    }
}
