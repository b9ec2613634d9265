use serde_json::Value;

use super::request::{JsonRpcRequest, RpcId};
use super::response::{JsonRpcError, JsonRpcResponse};

/// Maximum bytes accepted in one request body (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// One message read from a request body.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// Carries an `id`; always answered exactly once.
    Call(JsonRpcRequest),
    /// No `id`; never answered.
    Notification(JsonRpcRequest),
    /// Identified but unusable; answered with the prepared error.
    Rejected(JsonRpcResponse),
}

impl InboundMessage {
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Call(req) | Self::Notification(req) => Some(req.method.as_str()),
            Self::Rejected(_) => None,
        }
    }
}

/// Split a request body into independent JSON-RPC messages.
///
/// Accepts a single JSON object, a JSON array batch, or newline-delimited
/// JSON values. Malformed lines are logged and skipped. A non-empty body
/// that yields nothing parseable produces one parse error with a null id,
/// and one that parses but yields no usable message produces one invalid
/// request error. Only an empty body yields no messages at all.
pub fn parse_body(body: &[u8]) -> Vec<InboundMessage> {
    let text = match std::str::from_utf8(body) {
        Ok(s) => s.trim(),
        Err(e) => {
            tracing::warn!(error = %e, "request body is not valid UTF-8");
            return vec![rejected(JsonRpcError::parse_error())];
        }
    };

    if text.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        out.extend(classify_value(value));
    } else {
        let mut parsed_any = false;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(value) => {
                    parsed_any = true;
                    out.extend(classify_value(value));
                }
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "skipping malformed request line");
                }
            }
        }

        if !parsed_any {
            return vec![rejected(JsonRpcError::parse_error())];
        }
    }

    if out.is_empty() {
        tracing::warn!("request body held no usable JSON-RPC message");
        out.push(rejected(JsonRpcError::invalid_request_with(
            "No valid JSON-RPC message in body",
        )));
    }

    out
}

fn rejected(error: JsonRpcError) -> InboundMessage {
    InboundMessage::Rejected(JsonRpcResponse::error(None, error))
}

fn classify_value(value: Value) -> Vec<InboundMessage> {
    match value {
        Value::Array(items) if items.is_empty() => {
            vec![rejected(JsonRpcError::invalid_request_with("Empty batch"))]
        }
        Value::Array(items) => items.into_iter().filter_map(classify_object).collect(),
        other => classify_object(other).into_iter().collect(),
    }
}

fn classify_object(value: Value) -> Option<InboundMessage> {
    if !value.is_object() {
        tracing::warn!("rejecting non-object JSON-RPC message");
        return Some(rejected(JsonRpcError::invalid_request_with(
            "Request must be a JSON object",
        )));
    }

    // Presence of the member decides call vs notification, even when null.
    let has_id = value.get("id").is_some();
    let id = value
        .get("id")
        .and_then(|v| serde_json::from_value::<RpcId>(v.clone()).ok());

    match serde_json::from_value::<JsonRpcRequest>(value) {
        // Validate jsonrpc version
        Ok(req) if req.jsonrpc != "2.0" => {
            if has_id {
                Some(InboundMessage::Rejected(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request_with("Unsupported jsonrpc version"),
                )))
            } else {
                tracing::warn!(method = %req.method, "dropping notification with bad jsonrpc version");
                None
            }
        }
        Ok(mut req) if has_id => {
            req.id = id.or(Some(RpcId::Null));
            Some(InboundMessage::Call(req))
        }
        Ok(req) => Some(InboundMessage::Notification(req)),
        Err(e) if has_id => Some(InboundMessage::Rejected(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request_with(format!("Invalid request: {e}")),
        ))),
        Err(e) => {
            tracing::warn!(error = %e, "skipping invalid notification");
            None
        }
    }
}
