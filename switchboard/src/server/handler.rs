//! Task handler seam.
//!
//! A [`TaskHandler`] drives one task from *working* to a terminal state.
//! The processor persists whatever state and status message the handler
//! returns; handlers that need richer history access (like the agent loop)
//! take the registry as an explicit constructor parameter.

use std::future::Future;
use std::pin::Pin;

use a2a_types::{Message, Role, Task, TaskState};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::Result;

/// Drives one task to completion.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Processes `task` with the given current message.
    ///
    /// `task` is a snapshot; the returned task's `status.state` and
    /// `status.message` are written back to the registry by the processor.
    /// Handlers should observe `cancel` between long-running steps and bail
    /// out with [`ServerError::Canceled`](crate::errors::ServerError::Canceled).
    async fn handle_task(
        &self,
        task: Task,
        message: Message,
        cancel: CancellationToken,
    ) -> Result<Task>;
}

/// Default handler: completes every task by echoing the inbound text.
pub struct EchoTaskHandler;

#[async_trait]
impl TaskHandler for EchoTaskHandler {
    async fn handle_task(
        &self,
        mut task: Task,
        message: Message,
        _cancel: CancellationToken,
    ) -> Result<Task> {
        let text = message.joined_text();
        let reply = if text.is_empty() {
            "received your message".to_string()
        } else {
            text
        };

        task.status.state = TaskState::Completed;
        task.status.message = Some(Message::text(
            Role::Assistant,
            Uuid::new_v4().to_string(),
            reply,
        ));
        Ok(task)
    }
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Task>> + Send>>;

/// Adapter turning a plain async function into a [`TaskHandler`].
pub struct FnTaskHandler {
    function: Box<dyn Fn(Task, Message) -> HandlerFuture + Send + Sync>,
}

impl FnTaskHandler {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Task, Message) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            function: Box::new(function),
        }
    }
}

#[async_trait]
impl TaskHandler for FnTaskHandler {
    async fn handle_task(
        &self,
        task: Task,
        message: Message,
        _cancel: CancellationToken,
    ) -> Result<Task> {
        (self.function)(task, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::TaskStatus;

    fn submitted_task(message: Option<Message>) -> Task {
        Task {
            kind: "task".to_string(),
            id: "t-1".to_string(),
            context_id: "ctx-1".to_string(),
            status: TaskStatus {
                state: TaskState::Working,
                timestamp: None,
                message: message.clone(),
            },
            history: message.into_iter().collect(),
            artifacts: Vec::new(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn echo_handler_completes_with_inbound_text() {
        let message = Message::text(Role::User, "m1", "hello there");
        let task = submitted_task(Some(message.clone()));

        let result = EchoTaskHandler
            .handle_task(task, message, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status.state, TaskState::Completed);
        let reply = result.status.message.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.first_text(), Some("hello there"));
    }

    #[tokio::test]
    async fn echo_handler_falls_back_for_empty_text() {
        let message = Message::with_parts(Role::User, "m1", vec![]);
        let task = submitted_task(None);

        let result = EchoTaskHandler
            .handle_task(task, message, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            result.status.message.unwrap().first_text(),
            Some("received your message")
        );
    }

    #[tokio::test]
    async fn fn_handler_delegates() {
        let handler = FnTaskHandler::new(|mut task, _message| {
            Box::pin(async move {
                task.status.state = TaskState::InputRequired;
                Ok(task)
            })
        });

        let message = Message::text(Role::User, "m1", "more info please");
        let result = handler
            .handle_task(submitted_task(None), message, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status.state, TaskState::InputRequired);
    }
}
