//! # A2A (Agent2Agent) Protocol Types
//!
//! This crate provides the Rust data structures for the subset of the
//! Agent2Agent (A2A) protocol spoken by the switchboard server runtime:
//! the JSON-RPC 2.0 envelope, the `Task` lifecycle model, conversational
//! `Message`s with typed `Part`s, and the `AgentCard` discovery document.
//!
//! All types are plain `serde` data carriers; behaviour lives in the
//! server crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod agent_card;
pub use agent_card::{AgentCapabilities, AgentCard, AgentSkill};

// ============================================================================
// JSON-RPC 2.0 Envelope
// ============================================================================

/// Represents a JSON-RPC 2.0 identifier, which can be a string, number, or null.
///
/// The server must echo the identifier back with the same JSON type it was
/// received with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    Null,
}

/// A JSON-RPC 2.0 request object.
///
/// `jsonrpc` defaults to `"2.0"` and `method` to the empty string so that a
/// structurally valid JSON body always decodes; envelope validation (wrong
/// version, missing method) is the router's job and maps to `-32600`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The version of the JSON-RPC protocol. MUST be exactly "2.0".
    #[serde(default = "default_jsonrpc_version")]
    pub jsonrpc: String,
    /// The name of the method to be invoked.
    #[serde(default)]
    pub method: String,
    /// A structured value holding the parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// A unique identifier established by the client.
    ///
    /// A present-but-null id decodes as `Some(JsonRpcId::Null)`; only a
    /// genuinely absent field is `None`. The distinction matters because a
    /// null id must be echoed as null, while an absent one gets a
    /// server-synthesised id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present_id"
    )]
    pub id: Option<JsonRpcId>,
}

fn deserialize_present_id<'de, D>(deserializer: D) -> Result<Option<JsonRpcId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Some(JsonRpcId::Null)),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A JSON-RPC 2.0 response object, either success or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// The version of the JSON-RPC protocol. Always "2.0".
    pub jsonrpc: String,
    /// The result of the method invocation. Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error object. Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// The identifier established by the client, echoed verbatim.
    pub id: Option<JsonRpcId>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// A number indicating the error type that occurred.
    pub code: i32,
    /// A short description of the error.
    pub message: String,
    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc_version(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<JsonRpcId>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: default_jsonrpc_version(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data,
            }),
            id,
        }
    }
}

fn default_jsonrpc_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// The only supported JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

// JSON-RPC error codes used by the server.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_ERROR: i32 = -32000;

// ============================================================================
// Task Lifecycle
// ============================================================================

/// Defines the lifecycle states of a Task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// The task has been submitted and is awaiting execution.
    Submitted,
    /// The agent is actively working on the task.
    Working,
    /// The task is paused and waiting for input from the user.
    InputRequired,
    /// The task has been successfully completed.
    Completed,
    /// The task has been canceled.
    Canceled,
    /// The task failed due to an error during execution.
    Failed,
}

impl TaskState {
    /// Whether this state permits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// The wire representation of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the status of a task at a specific point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    /// The current state of the task's lifecycle.
    pub state: TaskState,
    /// An RFC 3339 datetime string indicating when this status was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// An optional message providing more detail, authored by the last actor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// A single, stateful unit of work created in response to a client message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// The type of this object, used as a discriminator. Always 'task'.
    #[serde(default = "default_task_kind")]
    pub kind: String,
    /// A unique identifier for the task, generated by the server.
    pub id: String,
    /// A grouping key for related tasks in the same conversation.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Messages exchanged during the task, oldest first. Append-only.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub history: Vec<Message>,
    /// Artifacts produced by the handler while working on the task.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifacts: Vec<Artifact>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

fn default_task_kind() -> String {
    TASK_KIND.to_string()
}

// ============================================================================
// Messages and Parts
// ============================================================================

/// Identifies the author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Messages sent by the client.
    User,
    /// Messages produced by the agent.
    Assistant,
    /// System instructions.
    System,
    /// Tool invocation results.
    Tool,
}

/// A single message in the conversation between a client and the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// The type of this object, used as a discriminator. Always 'message'.
    #[serde(default = "default_message_kind")]
    pub kind: String,
    /// A unique identifier for the message, generated by the sender.
    #[serde(rename = "messageId")]
    pub message_id: String,
    /// The author of the message.
    pub role: Role,
    /// The content parts that form the message body. Never empty.
    pub parts: Vec<Part>,
    /// The context identifier grouping related interactions.
    #[serde(skip_serializing_if = "Option::is_none", rename = "contextId")]
    pub context_id: Option<String>,
    /// The identifier of the task this message belongs to.
    #[serde(skip_serializing_if = "Option::is_none", rename = "taskId")]
    pub task_id: Option<String>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

fn default_message_kind() -> String {
    MESSAGE_KIND.to_string()
}

impl Message {
    /// Creates a message with a single text part.
    pub fn text(role: Role, message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_parts(role, message_id, vec![Part::text(text)])
    }

    /// Creates a message with the given parts and no optional fields.
    pub fn with_parts(role: Role, message_id: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            kind: default_message_kind(),
            message_id: message_id.into(),
            role,
            parts,
            context_id: None,
            task_id: None,
            metadata: None,
        }
    }

    /// Returns the text of the first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            Part::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Joins the text of all text parts with newlines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A discriminated union representing a typed fragment of a message.
///
/// The `kind` field discriminates the variants on the wire; unrecognised
/// discriminators fail to decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Part {
    /// A text segment.
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, Value>>,
    },
    /// A file reference, either inline bytes or a URI.
    File {
        file: FileContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, Value>>,
    },
    /// A structured data segment (e.g. JSON).
    Data {
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, Value>>,
    },
    /// A request by the agent to invoke a named tool.
    ToolCallRequest {
        /// Correlates this request with its result part.
        id: String,
        /// The name of the tool to invoke.
        name: String,
        /// The tool arguments as a JSON object.
        arguments: Value,
    },
    /// The result of a previously requested tool invocation.
    ToolCallResult {
        /// The id of the tool-call-request this result answers.
        id: String,
        /// The name of the tool that produced the result.
        name: String,
        /// The opaque result text, commonly JSON.
        result: String,
    },
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            metadata: None,
        }
    }

    /// Creates a structured data part.
    pub fn data(data: Value) -> Self {
        Self::Data {
            data,
            metadata: None,
        }
    }
}

/// File content, provided either directly as bytes or as a URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FileContent {
    WithBytes(FileWithBytes),
    WithUri(FileWithUri),
}

/// A file with its content provided directly as a base64-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileWithBytes {
    /// The base64-encoded content of the file.
    pub bytes: String,
    /// The MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// An optional name for the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A file with its content located at a URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileWithUri {
    /// A URL pointing to the file's content.
    pub uri: String,
    /// The MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// An optional name for the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An opaque named blob produced by the handler during a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    /// A unique identifier for the artifact within the scope of the task.
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    /// The content parts that make up the artifact.
    pub parts: Vec<Part>,
    /// An optional human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// An optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

// ============================================================================
// Method Parameter Types
// ============================================================================

/// Parameters for the `message/send` and `message/stream` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    /// The message being sent to the agent.
    pub message: Message,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Parameters for the `tasks/get` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueryParams {
    /// The unique identifier of the task.
    pub id: String,
    /// The number of most recent history messages to retrieve.
    #[serde(skip_serializing_if = "Option::is_none", rename = "historyLength")]
    pub history_length: Option<usize>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Parameters for the `tasks/cancel` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    /// The unique identifier of the task.
    pub id: String,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

// Constants for discriminator values.
pub const TASK_KIND: &str = "task";
pub const MESSAGE_KIND: &str = "message";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn part_kinds_use_kebab_case_discriminators() {
        let parts = vec![
            Part::text("hello"),
            Part::data(json!({"a": 1})),
            Part::ToolCallRequest {
                id: "call-1".to_string(),
                name: "get_weather".to_string(),
                arguments: json!({"city": "SF"}),
            },
            Part::ToolCallResult {
                id: "call-1".to_string(),
                name: "get_weather".to_string(),
                result: "{\"temp\":18}".to_string(),
            },
        ];

        let kinds: Vec<String> = parts
            .iter()
            .map(|p| {
                serde_json::to_value(p).unwrap()["kind"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["text", "data", "tool-call-request", "tool-call-result"]
        );
    }

    #[test]
    fn part_decodes_from_raw_map() {
        let raw = json!({"kind": "text", "text": "hello"});
        let part: Part = serde_json::from_value(raw).unwrap();
        assert_eq!(part, Part::text("hello"));
    }

    #[test]
    fn unknown_part_kind_is_rejected() {
        let raw = json!({"kind": "hologram", "text": "hello"});
        assert!(serde_json::from_value::<Part>(raw).is_err());
    }

    #[test]
    fn jsonrpc_id_round_trips_all_types() {
        for (value, expected) in [
            (json!("x"), JsonRpcId::String("x".to_string())),
            (json!(7), JsonRpcId::Number(7)),
            (json!(null), JsonRpcId::Null),
        ] {
            let id: JsonRpcId = serde_json::from_value(value.clone()).unwrap();
            assert_eq!(id, expected);
            assert_eq!(serde_json::to_value(&id).unwrap(), value);
        }
    }

    #[test]
    fn request_defaults_version_and_method() {
        let req: JsonRpcRequest = serde_json::from_value(json!({"params": {}})).unwrap();
        assert_eq!(req.jsonrpc, "2.0");
        assert!(req.method.is_empty());
        assert!(req.id.is_none());
    }

    #[test]
    fn null_request_id_is_present_not_absent() {
        let req: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "tasks/get", "id": null}))
                .unwrap();
        assert_eq!(req.id, Some(JsonRpcId::Null));
    }

    #[test]
    fn task_state_terminality() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
    }

    #[test]
    fn task_state_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(TaskState::InputRequired).unwrap(),
            json!("input-required")
        );
    }

    #[test]
    fn message_decodes_wire_shape() {
        let raw = json!({
            "kind": "message",
            "messageId": "m1",
            "role": "user",
            "parts": [{"kind": "text", "text": "hello"}]
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.first_text(), Some("hello"));
    }
}
