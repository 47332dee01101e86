//! Prometheus metrics for the server runtime.
//!
//! Counters are registered against a private registry and exposed in text
//! exposition format from the dedicated metrics listener.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::{Result, ServerError};

/// Metric instruments shared across the RPC surface and the processor.
pub struct Metrics {
    registry: Registry,
    rpc_requests: IntCounterVec,
    tasks_processed: IntCounterVec,
    tool_executions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let rpc_requests = IntCounterVec::new(
            Opts::new("a2a_rpc_requests_total", "Total JSON-RPC requests by method"),
            &["method"],
        )
        .map_err(metrics_error)?;
        let tasks_processed = IntCounterVec::new(
            Opts::new(
                "a2a_tasks_processed_total",
                "Total tasks driven to a state by the processor",
            ),
            &["state"],
        )
        .map_err(metrics_error)?;
        let tool_executions = IntCounterVec::new(
            Opts::new("a2a_tool_executions_total", "Total tool executions by outcome"),
            &["tool", "outcome"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(rpc_requests.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(tasks_processed.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(tool_executions.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            rpc_requests,
            tasks_processed,
            tool_executions,
        })
    }

    pub fn record_rpc_request(&self, method: &str) {
        self.rpc_requests.with_label_values(&[method]).inc();
    }

    pub fn record_task_processed(&self, state: &str) {
        self.tasks_processed.with_label_values(&[state]).inc();
    }

    pub fn record_tool_execution(&self, tool: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.tool_executions
            .with_label_values(&[tool, outcome])
            .inc();
    }

    /// Renders all registered metrics in Prometheus text exposition format.
    pub fn export(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %err, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

fn metrics_error(err: prometheus::Error) -> ServerError {
    ServerError::Internal {
        component: "metrics".to_string(),
        reason: err.to_string(),
    }
}
