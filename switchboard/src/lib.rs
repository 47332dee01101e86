//! # Switchboard
//!
//! An Agent-to-Agent (A2A) server runtime. A JSON-RPC 2.0 endpoint accepts
//! conversational messages, materialises each as a server-side task, admits
//! it to a bounded work queue, and drives it to completion through a
//! pluggable task handler — optionally a multi-turn agent loop over a
//! chat-completion provider with registered tools.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchboard::{A2AServer, Config};
//! use switchboard::providers::OpenAiChatClient;
//! use switchboard::tools::{BasicTool, Toolbox, json_result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> switchboard::Result<()> {
//!     let toolbox = Toolbox::new().with_tool(Arc::new(BasicTool::new(
//!         "get_weather",
//!         "Get current weather for a city",
//!         json!({
//!             "type": "object",
//!             "properties": {"city": {"type": "string"}},
//!             "required": ["city"]
//!         }),
//!         |_args| Box::pin(async { json_result(&json!({"temp": 18})) }),
//!     )));
//!
//!     let server = A2AServer::builder(Config::from_env())
//!         .with_chat_client(Arc::new(OpenAiChatClient::from_env("gpt-4o-mini")?))
//!         .with_toolbox(toolbox)
//!         .build()?;
//!
//!     server.serve().await
//! }
//! ```

pub mod agent;
pub mod config;
pub mod errors;
pub mod observability;
pub mod providers;
pub mod server;
pub mod tools;

// Re-export the protocol types crate for downstream convenience.
pub use a2a_types;

pub use agent::{ChatAgent, TaskResultProcessor};
pub use config::Config;
pub use errors::{Result, ServerError};
pub use server::{
    A2AServer, A2AServerBuilder, AgentInfo, EchoTaskHandler, FnTaskHandler, MessageHandler,
    TaskHandler, TaskRegistry,
};
