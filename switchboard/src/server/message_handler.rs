//! Transforms inbound RPC messages into newly created tasks.

use std::sync::Arc;

use a2a_types::{MessageSendParams, Task, TaskState};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{Result, ServerError};
use crate::server::registry::TaskRegistry;

/// Validates inbound messages and materialises them as tasks.
///
/// The handler only creates; admission to the work queue is the router's
/// responsibility so admission failures can be reported on the same RPC
/// reply.
pub struct MessageHandler {
    registry: Arc<TaskRegistry>,
}

impl MessageHandler {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    /// Handles `message/send`: validates the message and creates a task in
    /// state *submitted*.
    ///
    /// The context id is taken from the inbound message when the client
    /// supplied one, otherwise a fresh one is generated.
    pub fn handle_message_send(&self, params: MessageSendParams) -> Result<Task> {
        if params.message.parts.is_empty() {
            return Err(ServerError::EmptyMessage);
        }

        let context_id = params
            .message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        debug!(context_id = %context_id, message_id = %params.message.message_id, "creating task for message");
        Ok(self
            .registry
            .create_task(context_id, TaskState::Submitted, Some(params.message)))
    }

    /// Handles `message/stream` with the same validation and task creation.
    /// The wire framing of the stream itself is owned by the HTTP layer.
    pub fn handle_message_stream(&self, params: MessageSendParams) -> Result<Task> {
        self.handle_message_send(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::{Message, Part, Role};

    fn params(message: Message) -> MessageSendParams {
        MessageSendParams {
            message,
            metadata: None,
        }
    }

    #[test]
    fn creates_submitted_task_with_client_context() {
        let registry = Arc::new(TaskRegistry::new());
        let handler = MessageHandler::new(Arc::clone(&registry));

        let mut message = Message::text(Role::User, "m1", "hello");
        message.context_id = Some("ctx-42".to_string());

        let task = handler.handle_message_send(params(message)).unwrap();
        assert_eq!(task.context_id, "ctx-42");
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(registry.task_count(), 1);
    }

    #[test]
    fn generates_context_id_when_absent() {
        let registry = Arc::new(TaskRegistry::new());
        let handler = MessageHandler::new(registry);

        let task = handler
            .handle_message_send(params(Message::text(Role::User, "m1", "hello")))
            .unwrap();
        assert!(!task.context_id.is_empty());
    }

    #[test]
    fn rejects_messages_without_parts() {
        let registry = Arc::new(TaskRegistry::new());
        let handler = MessageHandler::new(Arc::clone(&registry));

        let message = Message::with_parts(Role::User, "m1", vec![]);
        let err = handler.handle_message_send(params(message)).unwrap_err();
        assert!(matches!(err, ServerError::EmptyMessage));
        assert_eq!(registry.task_count(), 0);
    }

    #[test]
    fn preserves_inbound_parts_verbatim() {
        let registry = Arc::new(TaskRegistry::new());
        let handler = MessageHandler::new(Arc::clone(&registry));

        let parts = vec![
            Part::text("first"),
            Part::data(serde_json::json!({"k": "v"})),
        ];
        let message = Message::with_parts(Role::User, "m1", parts.clone());

        let task = handler.handle_message_send(params(message)).unwrap();
        let stored = registry.get_task(&task.id).unwrap();
        assert_eq!(stored.status.message.unwrap().parts, parts);
    }
}
