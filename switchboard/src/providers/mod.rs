//! Chat-completion provider abstraction.
//!
//! The agent loop talks to an external chat-completion service through the
//! [`ChatClient`] trait. A reply carries either assistant text, tool calls,
//! or an input-required signal; everything else about the provider's wire
//! format stays behind the implementation.

mod mock;
mod openai;

pub use mock::MockChatClient;
pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::tools::ToolDescriptor;

/// The role of a chat message in the provider's conversation schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message rendered for the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Text content. May be absent for assistant messages that only carry
    /// tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool invocations requested by an assistant message.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// For tool-role messages, the id of the call being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant message carrying only tool calls.
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: None,
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// A tool-role message answering a previous call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A tool invocation requested by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Provider-assigned id correlating the call with its result.
    pub id: String,
    /// The name of the tool to invoke.
    pub name: String,
    /// The arguments as a JSON object.
    pub arguments: Value,
}

/// The provider's reply for one completion round.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    /// Assistant text, if any.
    pub content: Option<String>,
    /// Tool calls the provider wants executed before continuing.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Set when the provider signals that user input is required to proceed.
    pub input_required: bool,
}

impl ChatReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::default()
        }
    }

    pub fn needs_input() -> Self {
        Self {
            input_required: true,
            ..Self::default()
        }
    }
}

/// Generation options forwarded to the provider.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A synchronous (request/response) chat-completion client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// A stable identifier for the underlying model, for logging.
    fn model_name(&self) -> &str;

    /// Performs one completion round over the given conversation.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDescriptor>,
        options: &ChatOptions,
    ) -> Result<ChatReply>;
}
