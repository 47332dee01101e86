/// Main error type for the server runtime.
use a2a_types::{INTERNAL_ERROR, INVALID_PARAMS, SERVER_ERROR};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    // === Task Lifecycle Errors ===
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("task is already in terminal state {state}")]
    InvalidTransition { task_id: String, state: String },

    // === Toolbox Errors ===
    #[error("tool not found: {tool_name}")]
    ToolNotFound { tool_name: String },

    #[error("tool execution failed: {tool_name}: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    // === Message Handling Errors ===
    #[error("message must contain at least one part")]
    EmptyMessage,

    // === Admission Errors ===
    #[error("task queue is full")]
    QueueFull,

    // === Agent Loop Errors ===
    #[error("iteration limit reached after {limit} iterations")]
    IterationLimit { limit: usize },

    #[error("provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("provider authentication failed: {provider}")]
    ProviderAuthentication { provider: String },

    #[error("provider rate limit exceeded: {provider}")]
    ProviderRateLimit { provider: String },

    // === Cancellation ===
    #[error("operation canceled")]
    Canceled,

    // === Configuration Errors ===
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // === Network/IO Errors ===
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // === General System Errors ===
    #[error("internal error: {component}: {reason}")]
    Internal { component: String, reason: String },
}

impl ServerError {
    /// The JSON-RPC error code this error surfaces as at the RPC boundary.
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            Self::TaskNotFound { .. } | Self::InvalidTransition { .. } | Self::EmptyMessage => {
                INVALID_PARAMS
            }
            Self::Internal { .. } | Self::Serialization(_) => INTERNAL_ERROR,
            _ => SERVER_ERROR,
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_visible_messages_are_short_phrases() {
        let err = ServerError::TaskNotFound {
            task_id: "t-1".into(),
        };
        assert_eq!(err.to_string(), "task not found: t-1");

        let err = ServerError::QueueFull;
        assert_eq!(err.to_string(), "task queue is full");
    }

    #[test]
    fn jsonrpc_code_mapping() {
        let not_found = ServerError::TaskNotFound {
            task_id: "t-1".into(),
        };
        assert_eq!(not_found.jsonrpc_code(), INVALID_PARAMS);

        let internal = ServerError::Internal {
            component: "queue".into(),
            reason: "closed".into(),
        };
        assert_eq!(internal.jsonrpc_code(), INTERNAL_ERROR);

        let provider = ServerError::Provider {
            provider: "openai".into(),
            message: "boom".into(),
        };
        assert_eq!(provider.jsonrpc_code(), SERVER_ERROR);
    }
}
