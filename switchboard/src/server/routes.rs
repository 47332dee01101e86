//! JSON-RPC router for the A2A endpoint.
//!
//! A single POST endpoint decodes the envelope, dispatches by method, and
//! answers with exactly one JSON-RPC response. Protocol errors never mutate
//! state; handler errors are mapped to the error-code discipline of the
//! protocol.

use std::sync::{Arc, RwLock};

use a2a_types::{
    AgentCapabilities, AgentCard, JsonRpcId, JsonRpcRequest, JsonRpcResponse, Message,
    MessageSendParams, Role, TaskIdParams, TaskQueryParams, TaskState, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::CapabilitiesConfig;
use crate::observability::Metrics;
use crate::server::message_handler::MessageHandler;
use crate::server::queue::{QueuedTask, TaskQueue};
use crate::server::registry::TaskRegistry;
use crate::server::response::ResponseSender;
use crate::server::AgentInfo;

/// User-visible reason attached to tasks rejected at admission.
pub const QUEUE_FULL_MESSAGE: &str = "task queue is full. please try again later.";

/// State shared across all routes.
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<TaskRegistry>,
    pub message_handler: Arc<MessageHandler>,
    pub queue: TaskQueue,
    pub agent_info: Arc<RwLock<AgentInfo>>,
    pub capabilities: CapabilitiesConfig,
    pub metrics: Option<Arc<Metrics>>,
}

impl ServerState {
    /// Assembles the agent card from the current configuration snapshot.
    pub fn agent_card(&self) -> AgentCard {
        let info = self
            .agent_info
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        AgentCard::new(
            info.name.clone(),
            info.description.clone(),
            info.url.clone(),
            info.version.clone(),
        )
        .with_capabilities(AgentCapabilities {
            streaming: Some(self.capabilities.streaming),
            push_notifications: Some(self.capabilities.push_notifications),
            state_transition_history: Some(self.capabilities.state_transition_history),
        })
    }
}

/// `GET /health`
pub(crate) async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// `GET /.well-known/agent.json`
pub(crate) async fn handle_agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    info!("agent info requested");
    Json(state.agent_card())
}

/// `POST /a2a`: decodes the JSON-RPC envelope and dispatches by method.
pub(crate) async fn handle_rpc(
    State(state): State<ServerState>,
    body: String,
) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(err) => {
            error!(error = %err, "failed to parse json request");
            return ResponseSender::error(None, PARSE_ERROR, "parse error", None);
        }
    };

    if request.jsonrpc != JSONRPC_VERSION || request.method.is_empty() {
        warn!(version = %request.jsonrpc, method = %request.method, "invalid rpc envelope");
        return ResponseSender::error(request.id, INVALID_REQUEST, "invalid request", None);
    }

    // Synthesise an id when absent so the response always correlates.
    let id = request
        .id
        .unwrap_or_else(|| JsonRpcId::String(Uuid::new_v4().to_string()));

    info!(method = %request.method, "received a2a request");
    if let Some(metrics) = &state.metrics {
        metrics.record_rpc_request(&request.method);
    }

    match request.method.as_str() {
        "message/send" => handle_message_send(state, id, request.params).await,
        "message/stream" => handle_message_stream(state, id, request.params).await,
        "tasks/get" => handle_task_get(state, id, request.params),
        "tasks/cancel" => handle_task_cancel(state, id, request.params),
        other => {
            warn!(method = other, "unknown method requested");
            ResponseSender::error(Some(id), METHOD_NOT_FOUND, "method not found", None)
        }
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(
    params: Option<Value>,
) -> std::result::Result<T, ()> {
    let value = params.ok_or(())?;
    serde_json::from_value(value).map_err(|err| {
        error!(error = %err, "failed to decode params");
    })
}

async fn handle_message_send(
    state: ServerState,
    id: JsonRpcId,
    params: Option<Value>,
) -> Json<JsonRpcResponse> {
    let Ok(params) = decode_params::<MessageSendParams>(params) else {
        return ResponseSender::error(Some(id), INVALID_PARAMS, "invalid params", None);
    };

    let task = match state.message_handler.handle_message_send(params) {
        Ok(task) => task,
        Err(err) => {
            error!(error = %err, "failed to handle message send");
            return ResponseSender::error(Some(id), INTERNAL_ERROR, err.to_string(), None);
        }
    };

    let entry = QueuedTask {
        task_id: task.id.clone(),
        request_id: id.clone(),
    };
    match state.queue.try_enqueue(entry) {
        Ok(()) => {
            info!(task_id = %task.id, "task queued for processing");
            ResponseSender::success(Some(id), task)
        }
        Err(err) => {
            error!(task_id = %task.id, error = %err, "task admission failed");
            // Update first, then reply, so a tasks/get racing this response
            // already observes the failed state.
            let snapshot = fail_unadmitted_task(&state, task);
            ResponseSender::success(Some(id), snapshot)
        }
    }
}

async fn handle_message_stream(
    state: ServerState,
    id: JsonRpcId,
    params: Option<Value>,
) -> Json<JsonRpcResponse> {
    let Ok(params) = decode_params::<MessageSendParams>(params) else {
        return ResponseSender::error(Some(id), INVALID_PARAMS, "invalid params", None);
    };

    let task = match state.message_handler.handle_message_stream(params) {
        Ok(task) => task,
        Err(err) => {
            error!(error = %err, "failed to handle message stream");
            return ResponseSender::error(Some(id), INTERNAL_ERROR, err.to_string(), None);
        }
    };

    let entry = QueuedTask {
        task_id: task.id.clone(),
        request_id: id.clone(),
    };
    if let Err(err) = state.queue.try_enqueue(entry) {
        error!(task_id = %task.id, error = %err, "stream task admission failed");
        fail_unadmitted_task(&state, task);
        return ResponseSender::success(Some(id), json!("streaming started successfully"));
    }

    info!(task_id = %task.id, "stream task queued for processing");
    ResponseSender::success(Some(id), json!("streaming started successfully"))
}

fn fail_unadmitted_task(state: &ServerState, task: a2a_types::Task) -> a2a_types::Task {
    let failure = Message::text(
        Role::Assistant,
        Uuid::new_v4().to_string(),
        QUEUE_FULL_MESSAGE,
    );
    match state
        .registry
        .update_task(&task.id, TaskState::Failed, Some(failure))
    {
        Ok(updated) => updated,
        Err(err) => {
            error!(task_id = %task.id, error = %err, "failed to mark unadmitted task failed");
            task
        }
    }
}

fn handle_task_get(
    state: ServerState,
    id: JsonRpcId,
    params: Option<Value>,
) -> Json<JsonRpcResponse> {
    let Ok(params) = decode_params::<TaskQueryParams>(params) else {
        return ResponseSender::error(Some(id), INVALID_PARAMS, "invalid params", None);
    };

    info!(task_id = %params.id, "retrieving task");
    match state.registry.get_task(&params.id) {
        Some(mut task) => {
            if let Some(limit) = params.history_length {
                if task.history.len() > limit {
                    task.history = task.history.split_off(task.history.len() - limit);
                }
            }
            ResponseSender::success(Some(id), task)
        }
        None => {
            error!(task_id = %params.id, "task not found");
            ResponseSender::error(
                Some(id),
                INVALID_PARAMS,
                "task not found",
                Some(json!({"id": params.id})),
            )
        }
    }
}

fn handle_task_cancel(
    state: ServerState,
    id: JsonRpcId,
    params: Option<Value>,
) -> Json<JsonRpcResponse> {
    let Ok(params) = decode_params::<TaskIdParams>(params) else {
        return ResponseSender::error(Some(id), INVALID_PARAMS, "invalid params", None);
    };

    info!(task_id = %params.id, "canceling task");
    match state.registry.cancel_task(&params.id) {
        Ok(task) => ResponseSender::success(Some(id), task),
        Err(err) => {
            error!(task_id = %params.id, error = %err, "failed to cancel task");
            ResponseSender::error(
                Some(id),
                err.jsonrpc_code(),
                err.to_string(),
                Some(json!({"id": params.id})),
            )
        }
    }
}
