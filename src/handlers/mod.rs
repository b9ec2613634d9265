pub mod accounting;
pub mod cloud;
pub mod crm;
pub mod domains;
pub mod health;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::protocol::{
    CallToolResult, InitializeParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsParams, RpcId, ToolCallParams,
};
use crate::tools::{GatewayError, Tool, ToolRegistry, ToolResult};

/// Protocol revision answered when the client asks for one we do not know.
pub const PROTOCOL_VERSION_LATEST: &str = "2025-06-18";

pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Registry holding every built-in tool bundle.
pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.bulk_register(builtin_tools());
    registry
}

pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();
    tools.extend(crm::build_tools());
    tools.extend(accounting::build_tools());
    tools.extend(domains::build_tools());
    tools.extend(cloud::build_tools());
    tools.extend(health::build_tools());
    tools
}

/// JSON-RPC method routing on top of the tool registry.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
    enabled_ecosystems: Option<Vec<String>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, config: &ServerConfig) -> Self {
        Self {
            registry,
            tool_timeout: config.tool_timeout,
            enabled_ecosystems: config.enabled_ecosystems.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Dispatch a JSON-RPC request to the appropriate handler.
    ///
    /// Returns `None` for notifications (no response required).
    pub async fn dispatch(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if req.is_notification() {
            tracing::debug!(method = %req.method, "notification received");
            return None;
        }

        let id = req.id.clone();
        tracing::info!(method = %req.method, id = ?id, "processing request");

        let resp = match req.method.as_str() {
            "initialize" => self.initialize(id, req.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.list_tools(id, req.params),
            "tools/call" => self.call_tool(id, req.params).await,
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };
        Some(resp)
    }

    fn initialize(&self, id: Option<RpcId>, params: Option<Value>) -> JsonRpcResponse {
        let params = initialize_params(params.as_ref());
        let protocol_version = negotiate_protocol(params.protocol_version.as_deref());

        let result = serde_json::json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": true }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn list_tools(&self, id: Option<RpcId>, params: Option<Value>) -> JsonRpcResponse {
        let params: ListToolsParams = match params {
            None | Some(Value::Null) => ListToolsParams::default(),
            Some(v) => match serde_json::from_value(v) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tools/list params: {e}")),
                    );
                }
            },
        };

        let tools: Vec<_> = self
            .registry
            .list(params.ecosystem.as_deref())
            .into_iter()
            .filter(|d| self.ecosystem_enabled(&d.ecosystem))
            .collect();

        match serde_json::to_value(&tools) {
            Ok(tools) => JsonRpcResponse::success(id, serde_json::json!({ "tools": tools })),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    async fn call_tool(&self, id: Option<RpcId>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(v) => match serde_json::from_value(v) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing params for tools/call"),
                );
            }
        };

        let name = params.name;
        if !self.registry.contains(&name) {
            return JsonRpcResponse::error(id, JsonRpcError::tool_not_found(&name));
        }

        // Tools are synchronous; run them on the blocking pool under a timeout
        let registry = Arc::clone(&self.registry);
        let args = params.arguments.unwrap_or_default();
        let tool_name = name.clone();
        let task = tokio::task::spawn_blocking(move || registry.execute(&tool_name, args));

        let tool_result = match tokio::time::timeout(self.tool_timeout, task).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(GatewayError::NotFound(missing)))) => {
                return JsonRpcResponse::error(id, JsonRpcError::tool_not_found(&missing));
            }
            Ok(Err(join_err)) => {
                tracing::error!(tool = %name, error = %join_err, "tool task join error");
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error(format!("Tool '{name}' did not complete")),
                );
            }
            Err(_) => {
                tracing::warn!(tool = %name, timeout = ?self.tool_timeout, "tool call timed out");
                ToolResult::error(format!(
                    "Tool '{name}' timed out after {:?}",
                    self.tool_timeout
                ))
                .with_metadata("source", "timeout")
            }
        };

        match serde_json::to_value(CallToolResult::from(tool_result)) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    fn ecosystem_enabled(&self, ecosystem: &str) -> bool {
        match &self.enabled_ecosystems {
            Some(allowed) => allowed.iter().any(|e| e == ecosystem),
            None => true,
        }
    }
}

/// Lenient parse of `initialize` params; unknown shapes fall back to defaults.
pub fn initialize_params(params: Option<&Value>) -> InitializeParams {
    params
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// `clientInfo` of an `initialize` request, empty when absent.
pub fn client_info(req: &JsonRpcRequest) -> Map<String, Value> {
    initialize_params(req.params.as_ref()).client_info
}

fn negotiate_protocol(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|v| **v == r).copied())
        .unwrap_or(PROTOCOL_VERSION_LATEST)
}
