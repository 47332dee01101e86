//! Multi-turn agent loop over a chat-completion provider.
//!
//! [`ChatAgent`] implements [`TaskHandler`] by iterating against a
//! [`ChatClient`]: each round renders the task history to the provider's
//! message schema, attaches the toolbox's function descriptors, and either
//! executes requested tool calls or terminates the task on plain text.
//! Tool-call requests and results are appended to the task history through
//! the registry as they happen, so `tasks/get` observes them mid-flight.

use std::collections::HashMap;
use std::sync::Arc;

use a2a_types::{Message, Part, Role, Task, TaskState};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AgentLoopConfig;
use crate::errors::{Result, ServerError};
use crate::observability::Metrics;
use crate::providers::{ChatClient, ChatMessage, ChatOptions, ChatRole};
use crate::server::{TaskHandler, TaskRegistry};
use crate::tools::Toolbox;

/// Decides whether a tool-call result completes the task early.
///
/// Returning a message short-circuits the loop: the task terminates in
/// *completed* with that message. Returning `None` lets the loop continue.
pub trait TaskResultProcessor: Send + Sync {
    fn process_tool_result(&self, tool_call_result: &str) -> Option<Message>;
}

/// A [`TaskHandler`] that drives tasks through an LLM-style tool-calling
/// loop.
pub struct ChatAgent {
    client: Arc<dyn ChatClient>,
    toolbox: Arc<Toolbox>,
    registry: Arc<TaskRegistry>,
    options: ChatOptions,
    system_prompt: Option<String>,
    max_iterations: usize,
    result_processor: Option<Arc<dyn TaskResultProcessor>>,
    metrics: Option<Arc<Metrics>>,
}

impl ChatAgent {
    pub fn new(
        client: Arc<dyn ChatClient>,
        toolbox: Arc<Toolbox>,
        registry: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            client,
            toolbox,
            registry,
            options: ChatOptions::default(),
            system_prompt: None,
            max_iterations: AgentLoopConfig::default().max_iterations,
            result_processor: None,
            metrics: None,
        }
    }

    /// Applies the loop bounds and system prompt from configuration.
    pub fn with_config(mut self, config: &AgentLoopConfig) -> Self {
        self.max_iterations = config.max_iterations.max(1);
        self.system_prompt = config.system_prompt.clone();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_result_processor(mut self, processor: Arc<dyn TaskResultProcessor>) -> Self {
        self.result_processor = Some(processor);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Collects the conversation history for a task: the histories of all
    /// earlier tasks in the same context (oldest first), then the task's
    /// own. This is what lets a task paused in *input-required* resume when
    /// a later `message/send` reuses the context id.
    fn gather_history(&self, task: &Task) -> Vec<Message> {
        let mut context_tasks = self.registry.list_context(&task.context_id);
        context_tasks.reverse();

        let mut messages = Vec::new();
        let mut saw_current = false;
        for context_task in context_tasks {
            if context_task.id == task.id {
                saw_current = true;
            }
            messages.extend(context_task.history);
        }
        if !saw_current {
            messages.extend(task.history.iter().cloned());
        }
        messages
    }

    /// Renders a message history into the provider's message schema.
    fn render_conversation(&self, history: &[Message]) -> Vec<ChatMessage> {
        let mut conversation = Vec::new();

        if let Some(prompt) = &self.system_prompt {
            conversation.push(ChatMessage::text(ChatRole::System, prompt.clone()));
        }

        for message in history {
            match message.role {
                Role::User | Role::System => {
                    let text = message.joined_text();
                    if !text.is_empty() {
                        let role = if message.role == Role::System {
                            ChatRole::System
                        } else {
                            ChatRole::User
                        };
                        conversation.push(ChatMessage::text(role, text));
                    }
                }
                Role::Assistant => {
                    let mut calls = Vec::new();
                    for part in &message.parts {
                        if let Part::ToolCallRequest {
                            id,
                            name,
                            arguments,
                        } = part
                        {
                            calls.push(crate::providers::ToolCallRequest {
                                id: id.clone(),
                                name: name.clone(),
                                arguments: arguments.clone(),
                            });
                        }
                    }
                    let text = message.joined_text();
                    conversation.push(ChatMessage {
                        role: ChatRole::Assistant,
                        content: (!text.is_empty()).then_some(text),
                        tool_calls: calls,
                        tool_call_id: None,
                    });
                }
                Role::Tool => {
                    for part in &message.parts {
                        if let Part::ToolCallResult { id, result, .. } = part {
                            conversation.push(ChatMessage::tool_result(id.clone(), result.clone()));
                        }
                    }
                }
            }
        }

        conversation
    }
}

#[async_trait]
impl TaskHandler for ChatAgent {
    async fn handle_task(
        &self,
        mut task: Task,
        message: Message,
        cancel: CancellationToken,
    ) -> Result<Task> {
        let task_id = task.id.clone();
        let history = self.gather_history(&task);
        let mut conversation = self.render_conversation(&history);

        // A task created without a message has an empty history; fall back to
        // the message the processor handed us.
        if history.is_empty() {
            let text = message.joined_text();
            if !text.is_empty() {
                conversation.push(ChatMessage::text(ChatRole::User, text));
            }
        }

        for iteration in 0..self.max_iterations {
            if cancel.is_cancelled() {
                return Err(ServerError::Canceled);
            }
            // tasks/cancel flips the registry state synchronously; honour it
            // between provider rounds.
            if let Some(current) = self.registry.get_task(&task_id) {
                if current.status.state == TaskState::Canceled {
                    return Err(ServerError::Canceled);
                }
            }

            debug!(task_id = %task_id, iteration, "agent loop iteration");
            let reply = self
                .client
                .complete(
                    conversation.clone(),
                    self.toolbox.descriptors(),
                    &self.options,
                )
                .await?;

            if !reply.tool_calls.is_empty() {
                let request_parts: Vec<Part> = reply
                    .tool_calls
                    .iter()
                    .map(|call| Part::ToolCallRequest {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    })
                    .collect();
                self.registry.append_history(
                    &task_id,
                    Message::with_parts(
                        Role::Assistant,
                        Uuid::new_v4().to_string(),
                        request_parts,
                    ),
                )?;
                conversation.push(ChatMessage {
                    role: ChatRole::Assistant,
                    content: reply.content.clone(),
                    tool_calls: reply.tool_calls.clone(),
                    tool_call_id: None,
                });

                for call in &reply.tool_calls {
                    info!(task_id = %task_id, tool = %call.name, "executing requested tool");
                    let result = self
                        .toolbox
                        .execute(&call.name, argument_map(&call.arguments))
                        .await;

                    let result = match result {
                        Ok(result) => {
                            if let Some(metrics) = &self.metrics {
                                metrics.record_tool_execution(&call.name, true);
                            }
                            result
                        }
                        Err(err) => {
                            if let Some(metrics) = &self.metrics {
                                metrics.record_tool_execution(&call.name, false);
                            }
                            warn!(task_id = %task_id, tool = %call.name, error = %err, "tool execution failed");
                            return Err(err);
                        }
                    };

                    self.registry.append_history(
                        &task_id,
                        Message::with_parts(
                            Role::Tool,
                            Uuid::new_v4().to_string(),
                            vec![Part::ToolCallResult {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                result: result.clone(),
                            }],
                        ),
                    )?;
                    conversation.push(ChatMessage::tool_result(call.id.clone(), result.clone()));

                    if let Some(processor) = &self.result_processor {
                        if let Some(completion) = processor.process_tool_result(&result) {
                            info!(task_id = %task_id, "result processor completed the task");
                            task.status.state = TaskState::Completed;
                            task.status.message = Some(completion);
                            return Ok(task);
                        }
                    }
                }
                continue;
            }

            if reply.input_required {
                info!(task_id = %task_id, "provider requested user input");
                task.status.state = TaskState::InputRequired;
                task.status.message = reply
                    .content
                    .map(|text| Message::text(Role::Assistant, Uuid::new_v4().to_string(), text));
                return Ok(task);
            }

            if let Some(text) = reply.content {
                task.status.state = TaskState::Completed;
                task.status.message = Some(Message::text(
                    Role::Assistant,
                    Uuid::new_v4().to_string(),
                    text,
                ));
                return Ok(task);
            }

            return Err(ServerError::Provider {
                provider: self.client.model_name().to_string(),
                message: "empty reply from provider".to_string(),
            });
        }

        Err(ServerError::IterationLimit {
            limit: self.max_iterations,
        })
    }
}

fn argument_map(arguments: &Value) -> HashMap<String, Value> {
    match arguments {
        Value::Object(map) => map.clone().into_iter().collect(),
        _ => HashMap::new(),
    }
}
