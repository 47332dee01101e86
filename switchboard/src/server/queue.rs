//! Bounded task queue and the background processor draining it.
//!
//! Admission is non-blocking: a full queue is reported to the caller, which
//! fails the task but still answers the RPC with the created task. Exactly
//! one processor consumes the queue; a second worker periodically evicts
//! terminal tasks.

use std::sync::Arc;
use std::time::Duration;

use a2a_types::{JsonRpcId, Message, Role, TaskState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{Result, ServerError};
use crate::observability::Metrics;
use crate::server::handler::TaskHandler;
use crate::server::registry::TaskRegistry;

/// An admitted task awaiting dispatch.
///
/// Only the id is carried; the registry stays the source of truth for the
/// task record, so nothing can be lost between admission and dispatch.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task_id: String,
    /// The JSON-RPC id of the request that admitted the task.
    pub request_id: JsonRpcId,
}

/// Sending half of the bounded FIFO channel between RPC intake and the
/// processor.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<QueuedTask>,
}

impl TaskQueue {
    /// Creates a queue of the given capacity, returning the receiving half
    /// for the processor.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedTask>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Offers an entry without blocking.
    pub fn try_enqueue(&self, entry: QueuedTask) -> Result<()> {
        self.tx.try_send(entry).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ServerError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ServerError::Internal {
                component: "queue".to_string(),
                reason: "channel closed".to_string(),
            },
        })
    }
}

/// The single background consumer of the task queue.
pub struct TaskProcessor {
    registry: Arc<TaskRegistry>,
    handler: Arc<dyn TaskHandler>,
    rx: mpsc::Receiver<QueuedTask>,
    cancel: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl TaskProcessor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        handler: Arc<dyn TaskHandler>,
        rx: mpsc::Receiver<QueuedTask>,
        cancel: CancellationToken,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            registry,
            handler,
            rx,
            cancel,
            metrics,
        }
    }

    /// Consumes the queue until cancellation or channel closure.
    pub async fn run(mut self) {
        info!("task processor started");
        loop {
            let entry = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("task processor shutting down");
                    return;
                }
                entry = self.rx.recv() => entry,
            };

            let Some(entry) = entry else {
                info!("task queue closed, processor exiting");
                return;
            };
            self.process(entry).await;
        }
    }

    async fn process(&self, entry: QueuedTask) {
        let task_id = entry.task_id;
        let Some(task) = self.registry.get_task(&task_id) else {
            warn!(task_id = %task_id, "queued task no longer in registry");
            return;
        };

        // The current message normally rides on the status; synthesise an
        // empty user message when it is missing.
        let message = task.status.message.clone().unwrap_or_else(|| {
            Message::with_parts(Role::User, Uuid::new_v4().to_string(), Vec::new())
        });

        info!(task_id = %task_id, "processing task");

        if let Err(err) = self.registry.update_task(&task_id, TaskState::Working, None) {
            // A task canceled while queued lands here.
            error!(task_id = %task_id, error = %err, "failed to move task to working");
            return;
        }
        let snapshot = self.registry.get_task(&task_id).unwrap_or(task);

        match self
            .handler
            .handle_task(snapshot, message, self.cancel.child_token())
            .await
        {
            Ok(updated) => {
                let state = updated.status.state;
                if let Err(err) =
                    self.registry
                        .update_task(&task_id, state, updated.status.message)
                {
                    error!(task_id = %task_id, error = %err, "failed to persist handler result");
                    return;
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_task_processed(state.as_str());
                }
                info!(task_id = %task_id, state = %state, "task processed successfully");
            }
            Err(ServerError::Canceled) => {
                info!(task_id = %task_id, "task canceled during processing");
                if let Err(err) = self.registry.cancel_task_idempotent(&task_id) {
                    error!(task_id = %task_id, error = %err, "failed to mark task canceled");
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_task_processed(TaskState::Canceled.as_str());
                }
            }
            Err(err) => {
                error!(task_id = %task_id, error = %err, "failed to process task");
                let failure = Message::text(
                    Role::Assistant,
                    Uuid::new_v4().to_string(),
                    err.to_string(),
                );
                if let Err(update_err) =
                    self.registry
                        .update_task(&task_id, TaskState::Failed, Some(failure))
                {
                    error!(task_id = %task_id, error = %update_err, "failed to mark task failed");
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_task_processed(TaskState::Failed.as_str());
                }
            }
        }
    }
}

/// Periodically evicts terminal tasks older than the retention interval.
pub struct CleanupWorker {
    registry: Arc<TaskRegistry>,
    interval: Duration,
    cancel: CancellationToken,
}

impl CleanupWorker {
    pub fn new(registry: Arc<TaskRegistry>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            registry,
            interval,
            cancel,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick of a tokio interval completes immediately; the
        // cleanup cadence starts one full interval from now.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("task cleanup shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.registry.cleanup_completed_tasks(self.interval);
                }
            }
        }
    }
}
