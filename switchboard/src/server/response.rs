//! JSON-RPC response construction.
//!
//! A handler writes exactly one envelope per request; both constructors
//! return the final `Json` body, so calling either closes the response.

use a2a_types::{JsonRpcId, JsonRpcResponse, INTERNAL_ERROR};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// Builds JSON-RPC success and error envelopes for the RPC endpoint.
pub struct ResponseSender;

impl ResponseSender {
    /// Writes a success envelope echoing the request id verbatim.
    pub fn success<T: Serialize>(id: Option<JsonRpcId>, result: T) -> Json<JsonRpcResponse> {
        match serde_json::to_value(result) {
            Ok(value) => {
                debug!("sending success response");
                Json(JsonRpcResponse::success(id, value))
            }
            Err(err) => {
                error!(error = %err, "failed to serialize rpc result");
                Json(JsonRpcResponse::error(
                    id,
                    INTERNAL_ERROR,
                    "internal error".to_string(),
                    None,
                ))
            }
        }
    }

    /// Writes an error envelope echoing the request id verbatim.
    pub fn error(
        id: Option<JsonRpcId>,
        code: i32,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Json<JsonRpcResponse> {
        let message = message.into();
        debug!(code, message = %message, "sending error response");
        Json(JsonRpcResponse::error(id, code, message, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::INVALID_PARAMS;
    use serde_json::json;

    #[test]
    fn success_echoes_id_and_wraps_result() {
        let Json(response) =
            ResponseSender::success(Some(JsonRpcId::Number(7)), json!({"ok": true}));
        assert_eq!(response.jsonrpc, "2.0");
        assert_eq!(response.id, Some(JsonRpcId::Number(7)));
        assert_eq!(response.result, Some(json!({"ok": true})));
        assert!(response.error.is_none());
    }

    #[test]
    fn error_carries_code_message_and_data() {
        let Json(response) = ResponseSender::error(
            Some(JsonRpcId::String("x".to_string())),
            INVALID_PARAMS,
            "task not found",
            Some(json!({"id": "t-1"})),
        );
        assert_eq!(response.id, Some(JsonRpcId::String("x".to_string())));
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "task not found");
        assert_eq!(error.data, Some(json!({"id": "t-1"})));
        assert!(response.result.is_none());
    }

    #[test]
    fn null_id_is_preserved() {
        let Json(response) = ResponseSender::success(Some(JsonRpcId::Null), json!("ok"));
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["id"], json!(null));
    }
}
