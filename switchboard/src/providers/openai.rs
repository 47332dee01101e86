//! OpenAI-compatible chat-completion client.
//!
//! API Documentation: <https://platform.openai.com/docs/api-reference/chat>
//!
//! Works against any endpoint speaking the Chat Completions wire format,
//! which covers most inference gateways.

use serde_json::{json, Value};
use tracing::debug;

use super::{ChatClient, ChatMessage, ChatOptions, ChatReply, ChatRole, ToolCallRequest};
use crate::errors::{Result, ServerError};
use crate::tools::ToolDescriptor;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const PROVIDER: &str = "openai";

/// Chat-completion client for OpenAI-compatible endpoints.
///
/// # Authentication
///
/// The API key can be provided explicitly or loaded from the
/// `OPENAI_API_KEY` environment variable via [`from_env`](Self::from_env).
///
/// # Examples
///
/// ```ignore
/// let client = OpenAiChatClient::from_env("gpt-4o-mini")?
///     .with_base_url("https://gateway.internal/v1/chat/completions");
/// ```
pub struct OpenAiChatClient {
    model_name: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiChatClient {
    /// Environment variable name for the API key.
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";

    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Creates a client loading the API key from the environment.
    pub fn from_env(model_name: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV).map_err(|_| {
            ServerError::InvalidConfiguration {
                field: Self::API_KEY_ENV.to_string(),
                reason: "not set".to_string(),
            }
        })?;

        if api_key.is_empty() {
            return Err(ServerError::InvalidConfiguration {
                field: Self::API_KEY_ENV.to_string(),
                reason: "api key cannot be empty".to_string(),
            });
        }

        Ok(Self::new(model_name, api_key))
    }

    /// Sets a custom base URL, for OpenAI-compatible gateways.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_payload(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
        options: &ChatOptions,
    ) -> Value {
        let rendered: Vec<Value> = messages
            .iter()
            .map(|message| {
                let role = match message.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::Tool => "tool",
                };

                let mut rendered = json!({
                    "role": role,
                    "content": message.content.clone().unwrap_or_default(),
                });

                if !message.tool_calls.is_empty() {
                    let calls: Vec<Value> = message
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "type": "function",
                                "id": call.id,
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    rendered["tool_calls"] = json!(calls);
                }

                if let Some(call_id) = &message.tool_call_id {
                    rendered["tool_call_id"] = json!(call_id);
                }

                rendered
            })
            .collect();

        let mut payload = json!({
            "model": self.model_name,
            "messages": rendered,
        });

        if let Some(temperature) = options.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }

        if !tools.is_empty() {
            let rendered_tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            payload["tools"] = json!(rendered_tools);
        }

        payload
    }

    fn parse_reply(&self, body: &Value) -> Result<ChatReply> {
        let first_choice = body
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| ServerError::Provider {
                provider: PROVIDER.to_string(),
                message: "missing or invalid 'choices' field in response".to_string(),
            })?;

        let message = first_choice
            .get("message")
            .ok_or_else(|| ServerError::Provider {
                provider: PROVIDER.to_string(),
                message: "missing 'message' field in choice".to_string(),
            })?;

        let mut reply = ChatReply::default();

        if let Some(text) = message.get("content").and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                reply.content = Some(text.trim().to_string());
            }
        }

        if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
            for call in calls {
                let id = call
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ServerError::Provider {
                        provider: PROVIDER.to_string(),
                        message: "missing 'id' in tool call".to_string(),
                    })?;

                let function = call.get("function").ok_or_else(|| ServerError::Provider {
                    provider: PROVIDER.to_string(),
                    message: "missing 'function' in tool call".to_string(),
                })?;

                let name = function
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ServerError::Provider {
                        provider: PROVIDER.to_string(),
                        message: "missing 'name' in tool call function".to_string(),
                    })?;

                // Arguments arrive as a JSON-encoded string or an object.
                let arguments = function.get("arguments").cloned().unwrap_or(Value::Null);
                let arguments = match arguments {
                    Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
                    other => other,
                };

                reply.tool_calls.push(ToolCallRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                });
            }
        }

        Ok(reply)
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDescriptor>,
        options: &ChatOptions,
    ) -> Result<ChatReply> {
        let payload = self.build_payload(&messages, &tools, options);
        debug!(model = %self.model_name, messages = messages.len(), "calling chat completion");

        let response = self
            .http
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());

            return Err(match status.as_u16() {
                401 | 403 => ServerError::ProviderAuthentication {
                    provider: PROVIDER.to_string(),
                },
                429 => ServerError::ProviderRateLimit {
                    provider: PROVIDER.to_string(),
                },
                _ => ServerError::Provider {
                    provider: PROVIDER.to_string(),
                    message: format!("http {status}: {error_body}"),
                },
            });
        }

        let body: Value = response.json().await?;
        self.parse_reply(&body)
    }
}
