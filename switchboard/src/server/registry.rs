//! In-memory task registry.
//!
//! The registry exclusively owns every task record. All other components
//! hold only a task id or a snapshot; mutations go through the registry,
//! which serialises transitions per task id. Snapshots returned to callers
//! are full clones and safe to observe without further synchronisation.

use std::time::Duration;

use a2a_types::{Message, Task, TaskState, TaskStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{Result, ServerError};

/// Thread-safe in-memory store of task records with lifecycle enforcement.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task with a fresh id and a freshly stamped status.
    ///
    /// The initial state is normally [`TaskState::Submitted`]; the processor
    /// may create directly in [`TaskState::Working`]. The initial message,
    /// when present, becomes both `status.message` and the first history
    /// entry.
    pub fn create_task(
        &self,
        context_id: impl Into<String>,
        state: TaskState,
        message: Option<Message>,
    ) -> Task {
        let task = Task {
            kind: a2a_types::TASK_KIND.to_string(),
            id: Uuid::new_v4().to_string(),
            context_id: context_id.into(),
            status: TaskStatus {
                state,
                timestamp: Some(now_timestamp()),
                message: message.clone(),
            },
            history: message.into_iter().collect(),
            artifacts: Vec::new(),
            metadata: None,
        };

        debug!(task_id = %task.id, context_id = %task.context_id, state = %state, "task created");
        self.tasks.insert(task.id.clone(), task.clone());
        task
    }

    /// Returns a snapshot of the task, if it exists.
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    /// Atomically transitions a task to a new state, stamping a fresh
    /// timestamp.
    ///
    /// Fails with `TaskNotFound` for unknown ids and `InvalidTransition`
    /// when the task is already terminal. A provided message is appended to
    /// the history and becomes `status.message`; with `None` the previous
    /// status message is preserved.
    pub fn update_task(
        &self,
        task_id: &str,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ServerError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        if entry.status.state.is_terminal() {
            return Err(ServerError::InvalidTransition {
                task_id: task_id.to_string(),
                state: entry.status.state.to_string(),
            });
        }

        entry.status.state = state;
        entry.status.timestamp = Some(now_timestamp());
        if let Some(message) = message {
            entry.history.push(message.clone());
            entry.status.message = Some(message);
        }

        debug!(task_id, state = %state, "task updated");
        Ok(entry.value().clone())
    }

    /// Transitions a task to `canceled` from any non-terminal state.
    pub fn cancel_task(&self, task_id: &str) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ServerError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        if entry.status.state.is_terminal() {
            return Err(ServerError::InvalidTransition {
                task_id: task_id.to_string(),
                state: entry.status.state.to_string(),
            });
        }

        entry.status.state = TaskState::Canceled;
        entry.status.timestamp = Some(now_timestamp());

        info!(task_id, "task canceled");
        Ok(entry.value().clone())
    }

    /// Like [`cancel_task`](Self::cancel_task), but an already-canceled task
    /// is returned as-is instead of failing. Other terminal states still
    /// fail.
    pub fn cancel_task_idempotent(&self, task_id: &str) -> Result<Task> {
        match self.cancel_task(task_id) {
            Err(ServerError::InvalidTransition { .. }) => {
                let task = self
                    .get_task(task_id)
                    .ok_or_else(|| ServerError::TaskNotFound {
                        task_id: task_id.to_string(),
                    })?;
                if task.status.state == TaskState::Canceled {
                    Ok(task)
                } else {
                    Err(ServerError::InvalidTransition {
                        task_id: task_id.to_string(),
                        state: task.status.state.to_string(),
                    })
                }
            }
            other => other,
        }
    }

    /// Appends a message to a task's history without changing its state.
    pub fn append_history(&self, task_id: &str, message: Message) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ServerError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        entry.history.push(message);
        Ok(entry.value().clone())
    }

    /// Returns all tasks sharing a context id, newest first.
    pub fn list_context(&self, context_id: &str) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.value().context_id == context_id)
            .map(|entry| entry.value().clone())
            .collect();

        // Status timestamps share a fixed RFC 3339 format, so the lexical
        // order is the chronological order.
        tasks.sort_by(|a, b| b.status.timestamp.cmp(&a.status.timestamp));
        tasks
    }

    /// Evicts terminal tasks whose last status timestamp is older than
    /// `retention`. Returns the number of evicted tasks.
    pub fn cleanup_completed_tasks(&self, retention: Duration) -> usize {
        let before = self.tasks.len();
        let now = Utc::now();

        self.tasks.retain(|task_id, task| {
            if !task.status.state.is_terminal() {
                return true;
            }
            match task_age(task, now) {
                Some(age) => {
                    let evict = age >= retention;
                    if evict {
                        debug!(task_id = %task_id, state = %task.status.state, "evicting terminal task");
                    }
                    !evict
                }
                None => {
                    warn!(task_id = %task_id, "terminal task has no parseable timestamp, evicting");
                    false
                }
            }
        });

        let evicted = before - self.tasks.len();
        if evicted > 0 {
            info!(evicted, "cleaned up completed tasks");
        }
        evicted
    }

    /// The number of stored tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn task_age(task: &Task, now: DateTime<Utc>) -> Option<Duration> {
    let stamp = task.status.timestamp.as_deref()?;
    let recorded = DateTime::parse_from_rfc3339(stamp).ok()?;
    (now - recorded.with_timezone(&Utc)).to_std().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::Role;

    fn user_message(id: &str, text: &str) -> Message {
        Message::text(Role::User, id, text)
    }

    #[test]
    fn create_task_stamps_status_and_history() {
        let registry = TaskRegistry::new();
        let message = user_message("m1", "hello world");

        let task = registry.create_task("ctx-1", TaskState::Submitted, Some(message.clone()));

        assert!(!task.id.is_empty());
        assert_eq!(task.context_id, "ctx-1");
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.status.message, Some(message.clone()));
        assert!(task.status.timestamp.is_some());
        assert_eq!(task.history, vec![message]);
    }

    #[test]
    fn create_task_with_working_state() {
        let registry = TaskRegistry::new();
        let task = registry.create_task("ctx-2", TaskState::Working, None);
        assert_eq!(task.status.state, TaskState::Working);
        assert!(task.history.is_empty());
    }

    #[test]
    fn update_appends_message_and_restamps() {
        let registry = TaskRegistry::new();
        let task = registry.create_task("ctx", TaskState::Submitted, Some(user_message("m1", "hi")));
        let first_stamp = task.status.timestamp.clone();

        let reply = Message::text(Role::Assistant, "m2", "done");
        let updated = registry
            .update_task(&task.id, TaskState::Completed, Some(reply.clone()))
            .unwrap();

        assert_eq!(updated.status.state, TaskState::Completed);
        assert_eq!(updated.status.message, Some(reply));
        assert_eq!(updated.history.len(), 2);
        assert_ne!(updated.status.timestamp, first_stamp);
    }

    #[test]
    fn update_without_message_preserves_previous_status_message() {
        let registry = TaskRegistry::new();
        let message = user_message("m1", "hi");
        let task = registry.create_task("ctx", TaskState::Submitted, Some(message.clone()));

        let updated = registry
            .update_task(&task.id, TaskState::Working, None)
            .unwrap();
        assert_eq!(updated.status.message, Some(message));
        assert_eq!(updated.history.len(), 1);
    }

    #[test]
    fn terminal_tasks_refuse_further_transitions() {
        let registry = TaskRegistry::new();
        for terminal in [TaskState::Completed, TaskState::Failed, TaskState::Canceled] {
            let task = registry.create_task("ctx", TaskState::Submitted, None);
            registry.update_task(&task.id, terminal, None).unwrap();

            let err = registry
                .update_task(&task.id, TaskState::Working, None)
                .unwrap_err();
            assert!(matches!(err, ServerError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn update_unknown_task_is_not_found() {
        let registry = TaskRegistry::new();
        let err = registry
            .update_task("no-such-task", TaskState::Working, None)
            .unwrap_err();
        assert!(matches!(err, ServerError::TaskNotFound { .. }));
    }

    #[test]
    fn cancel_transitions_non_terminal_states() {
        let registry = TaskRegistry::new();
        for state in [TaskState::Submitted, TaskState::Working, TaskState::InputRequired] {
            let task = registry.create_task("ctx", state, None);
            let canceled = registry.cancel_task(&task.id).unwrap();
            assert_eq!(canceled.status.state, TaskState::Canceled);
        }
    }

    #[test]
    fn cancel_is_rejected_on_terminal_tasks() {
        let registry = TaskRegistry::new();
        let task = registry.create_task("ctx", TaskState::Submitted, None);
        registry.cancel_task(&task.id).unwrap();

        // A second cancel hits a terminal task.
        let err = registry.cancel_task(&task.id).unwrap_err();
        assert!(matches!(err, ServerError::InvalidTransition { .. }));

        let err = registry.cancel_task("missing").unwrap_err();
        assert!(matches!(err, ServerError::TaskNotFound { .. }));
    }

    #[test]
    fn idempotent_cancel_accepts_already_canceled_only() {
        let registry = TaskRegistry::new();
        let task = registry.create_task("ctx", TaskState::Working, None);
        registry.cancel_task(&task.id).unwrap();

        let snapshot = registry.cancel_task_idempotent(&task.id).unwrap();
        assert_eq!(snapshot.status.state, TaskState::Canceled);

        let completed = registry.create_task("ctx", TaskState::Working, None);
        registry
            .update_task(&completed.id, TaskState::Completed, None)
            .unwrap();
        let err = registry.cancel_task_idempotent(&completed.id).unwrap_err();
        assert!(matches!(err, ServerError::InvalidTransition { .. }));
    }

    #[test]
    fn get_task_is_a_pure_read() {
        let registry = TaskRegistry::new();
        let task = registry.create_task("ctx", TaskState::Submitted, Some(user_message("m", "x")));

        let a = registry.get_task(&task.id).unwrap();
        let b = registry.get_task(&task.id).unwrap();
        assert_eq!(a, b);
        assert!(registry.get_task("missing").is_none());
    }

    #[test]
    fn list_context_returns_newest_first() {
        let registry = TaskRegistry::new();
        let first = registry.create_task("shared", TaskState::Submitted, None);
        std::thread::sleep(Duration::from_millis(2));
        let second = registry.create_task("shared", TaskState::Submitted, None);
        registry.create_task("other", TaskState::Submitted, None);

        let tasks = registry.list_context("shared");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, second.id);
        assert_eq!(tasks[1].id, first.id);
    }

    #[test]
    fn cleanup_evicts_only_aged_terminal_tasks() {
        let registry = TaskRegistry::new();
        let done = registry.create_task("ctx", TaskState::Submitted, None);
        registry.update_task(&done.id, TaskState::Completed, None).unwrap();
        let running = registry.create_task("ctx", TaskState::Working, None);

        // Nothing is old enough yet.
        assert_eq!(registry.cleanup_completed_tasks(Duration::from_secs(60)), 0);
        assert_eq!(registry.task_count(), 2);

        // With zero retention every terminal task is stale.
        assert_eq!(registry.cleanup_completed_tasks(Duration::ZERO), 1);
        assert!(registry.get_task(&done.id).is_none());
        assert!(registry.get_task(&running.id).is_some());
    }

    #[test]
    fn concurrent_transitions_respect_the_state_machine() {
        let registry = std::sync::Arc::new(TaskRegistry::new());
        let task = registry.create_task("ctx", TaskState::Submitted, None);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = std::sync::Arc::clone(&registry);
            let task_id = task.id.clone();
            handles.push(std::thread::spawn(move || {
                let _ = registry.update_task(&task_id, TaskState::Working, None);
                let _ = registry.update_task(&task_id, TaskState::Completed, None);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Exactly one terminal transition won; the task must be completed and
        // immutable afterwards.
        let final_task = registry.get_task(&task.id).unwrap();
        assert_eq!(final_task.status.state, TaskState::Completed);
        assert!(registry
            .update_task(&task.id, TaskState::Working, None)
            .is_err());
    }
}
