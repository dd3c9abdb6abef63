//! Background task orchestration for the health monitor.
//!
//! Probe loops are modeled as named, cancellable periodic tasks rather
//! than fire-and-forget timers: each task listens on a broadcast shutdown
//! channel, so shutdown is deterministic and testable without real
//! wall-clock waits.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Status of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is currently running.
    Running,
    /// Task exited (completed, panicked, or was cancelled).
    Finished,
}

/// Central registry for background task management.
///
/// Provides named task registration, unified shutdown semantics, and
/// health reporting.
pub struct TaskRegistry {
    tasks: HashMap<&'static str, JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
    shutting_down: bool,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            tasks: HashMap::new(),
            shutdown_tx,
            shutting_down: false,
        }
    }

    /// Spawn a named background task.
    ///
    /// The task races against a shutdown signal via `tokio::select!` and
    /// exits when either finishes.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutting_down {
            warn!(task = name, "Ignoring spawn during shutdown");
            return;
        }

        // A task with the same name replaces the previous instance.
        if let Some(old) = self.tasks.remove(name) {
            old.abort();
            debug!(task = name, "Aborted previous task instance");
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task => {
                    debug!(task = name, "Task completed");
                }
                _ = shutdown_rx.recv() => {
                    debug!(task = name, "Task received shutdown signal");
                }
            }
        });

        info!(task = name, "Spawned background task");
        self.tasks.insert(name, handle);
    }

    /// Spawn a periodic task that runs at a fixed interval.
    ///
    /// The first tick fires immediately, so a fresh snapshot exists soon
    /// after startup rather than one full interval later.
    pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, interval: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.spawn(name, async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                task().await;
            }
        });
    }

    /// Status of all registered tasks.
    pub fn health_check(&self) -> Vec<(&'static str, TaskStatus)> {
        self.tasks
            .iter()
            .map(|(name, handle)| {
                let status = if handle.is_finished() {
                    TaskStatus::Finished
                } else {
                    TaskStatus::Running
                };
                (*name, status)
            })
            .collect()
    }

    /// Whether every registered task is still running.
    pub fn all_running(&self) -> bool {
        self.tasks.values().all(|handle| !handle.is_finished())
    }

    /// Signal shutdown and await every task.
    pub async fn shutdown_all(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        let receivers = self.shutdown_tx.send(()).unwrap_or(0);
        debug!(receivers, "Broadcast shutdown to background tasks");

        for (name, handle) in self.tasks.drain() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(task = name, error = %e, "Background task ended abnormally");
                }
            }
        }
        info!("All background tasks stopped");
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
