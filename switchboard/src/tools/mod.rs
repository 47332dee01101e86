//! Tool registry for the agent loop.
//!
//! A [`Tool`] is a named, schema-described callable the agent can invoke.
//! The [`Toolbox`] maps names to tools bijectively and exposes the set in the
//! chat-completion function-calling shape via [`Toolbox::descriptors`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, ServerError};

/// Core trait for all tools exposed to the agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name of the tool. Must be unique within a toolbox.
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// The JSON Schema describing the tool's parameters.
    fn parameters(&self) -> Value;

    /// Executes the tool with the provided arguments.
    ///
    /// The returned string is treated by callers as opaque text (commonly
    /// JSON) and round-tripped into the task history.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<String>;
}

/// A tool's interface in the chat-completion function-calling shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the parameters.
    pub parameters: Value,
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Async closure type backing a [`BasicTool`].
pub type ToolExecutor = Box<dyn Fn(HashMap<String, Value>) -> ToolFuture + Send + Sync>;

/// A simple [`Tool`] implementation wrapping an async closure.
///
/// # Examples
///
/// ```ignore
/// use switchboard::tools::{BasicTool, json_result};
/// use serde_json::json;
///
/// let weather = BasicTool::new(
///     "get_weather",
///     "Get current weather for a city",
///     json!({
///         "type": "object",
///         "properties": {"city": {"type": "string"}},
///         "required": ["city"]
///     }),
///     |args| {
///         Box::pin(async move {
///             let city = args.get("city").and_then(|v| v.as_str()).unwrap_or("unknown");
///             json_result(&json!({"city": city, "temp": 18}))
///         })
///     },
/// );
/// ```
pub struct BasicTool {
    name: String,
    description: String,
    parameters: Value,
    executor: ToolExecutor,
}

impl BasicTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: F,
    ) -> Self
    where
        F: Fn(HashMap<String, Value>) -> ToolFuture + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor: Box::new(executor),
        }
    }
}

#[async_trait]
impl Tool for BasicTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<String> {
        (self.executor)(arguments).await
    }
}

/// Marshals any serializable value into a tool-result string.
pub fn json_result<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// A registry of named tools.
///
/// Adding a tool under an existing name replaces the previous one. The
/// toolbox is effectively read-only after server construction.
#[derive(Default)]
pub struct Toolbox {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, overwriting any previous tool of the same name.
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style helper to add a tool while consuming the toolbox.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.add_tool(tool);
        self
    }

    /// Whether a tool with the given name exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// The names of all registered tools, in no particular order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Whether the toolbox holds no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors for all tools, compatible with the chat-completion
    /// function-calling contract.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Executes a tool by name.
    ///
    /// Fails with [`ServerError::ToolNotFound`] when the name is unknown; any
    /// error raised by the executor is surfaced unchanged.
    pub async fn execute(&self, name: &str, arguments: HashMap<String, Value>) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ServerError::ToolNotFound {
                tool_name: name.to_string(),
            })?;

        debug!(tool = name, "executing tool");
        tool.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counting_tool(name: &str, reply: &'static str) -> Arc<dyn Tool> {
        Arc::new(BasicTool::new(
            name,
            "test tool",
            json!({"type": "object"}),
            move |_args| Box::pin(async move { Ok(reply.to_string()) }),
        ))
    }

    #[tokio::test]
    async fn add_tool_overwrites_same_name() {
        let mut toolbox = Toolbox::new();
        toolbox.add_tool(counting_tool("echo", "first"));
        toolbox.add_tool(counting_tool("echo", "second"));

        assert_eq!(toolbox.tool_names(), vec!["echo".to_string()]);
        let result = toolbox.execute("echo", HashMap::new()).await.unwrap();
        assert_eq!(result, "second");
    }

    #[tokio::test]
    async fn execute_unknown_tool_fails() {
        let toolbox = Toolbox::new();
        let err = toolbox.execute("missing", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::ToolNotFound { .. }));
        assert_eq!(err.to_string(), "tool not found: missing");
    }

    #[tokio::test]
    async fn executor_errors_surface_unchanged() {
        let tool = Arc::new(BasicTool::new(
            "flaky",
            "always fails",
            json!({"type": "object"}),
            |_args| {
                Box::pin(async {
                    Err(ServerError::ToolExecutionFailed {
                        tool_name: "flaky".to_string(),
                        reason: "upstream unavailable".to_string(),
                    })
                })
            },
        ));
        let toolbox = Toolbox::new().with_tool(tool);

        let err = toolbox.execute("flaky", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::ToolExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn executor_receives_arguments() {
        let tool = Arc::new(BasicTool::new(
            "greet",
            "greets by name",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
            |args| {
                Box::pin(async move {
                    let name = args
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("stranger")
                        .to_string();
                    json_result(&json!({"greeting": format!("hello {name}")}))
                })
            },
        ));
        let toolbox = Toolbox::new().with_tool(tool);

        let mut args = HashMap::new();
        args.insert("name".to_string(), json!("ada"));
        let result = toolbox.execute("greet", args).await.unwrap();
        assert_eq!(result, r#"{"greeting":"hello ada"}"#);
    }

    #[test]
    fn descriptors_expose_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}}
        });
        let tool = Arc::new(BasicTool::new(
            "get_weather",
            "weather lookup",
            schema.clone(),
            |_args| Box::pin(async { Ok(String::new()) }),
        ));
        let toolbox = Toolbox::new().with_tool(tool);

        let descriptors = toolbox.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "get_weather");
        assert_eq!(descriptors[0].description, "weather lookup");
        assert_eq!(descriptors[0].parameters, schema);
    }

    #[test]
    fn has_tool_and_names() {
        let toolbox = Toolbox::new().with_tool(counting_tool("a", "x"));
        assert!(toolbox.has_tool("a"));
        assert!(!toolbox.has_tool("b"));
        assert!(!toolbox.is_empty());
    }
}
