//! Tool Invocation Gateway.
//!
//! Tools are plain capabilities registered by name. The registry is the only
//! boundary the streaming layer talks to: it never lets a tool failure or a
//! tool panic escape as anything other than a [`ToolResult`] with
//! `status: "error"`.

mod registry;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use registry::ToolRegistry;

/// Public description of a registered tool, as served by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub ecosystem: String,
    pub version: String,
    pub required_credentials: Vec<String>,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        ecosystem: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ecosystem: ecosystem.into(),
            version: "0.1.0".into(),
            required_credentials: Vec::new(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn with_credentials(mut self, names: &[&str]) -> Self {
        self.required_credentials = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
    Partial,
}

/// Outcome of one tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(data: Map<String, Value>) -> Self {
        Self {
            status: ToolStatus::Ok,
            data,
            metadata: Map::new(),
        }
    }

    /// Error result carrying `data.error = message`.
    pub fn error(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("error".into(), Value::String(message.into()));
        Self {
            status: ToolStatus::Error,
            data,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}

/// What a tool hands back on success.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
    /// Set when the tool returned only part of what was asked for.
    pub partial: bool,
}

impl ToolOutput {
    pub fn new(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        Self {
            data,
            metadata: Map::new(),
            partial: false,
        }
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }
}

impl From<ToolOutput> for ToolResult {
    fn from(out: ToolOutput) -> Self {
        Self {
            status: if out.partial {
                ToolStatus::Partial
            } else {
                ToolStatus::Ok
            },
            data: out.data,
            metadata: out.metadata,
        }
    }
}

/// Failure reported by a tool's own logic.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

/// Failure of the gateway itself (as opposed to the tool).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("No tool registered with name '{0}'")]
    NotFound(String),
}

/// Capability every tool provides. Invocation is synchronous; callers run it
/// off the async executor.
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError>;
}

/// Read an optional string argument.
pub fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Read a required string argument.
pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    str_arg(args, key).ok_or_else(|| ToolError::InvalidArguments(format!("`{key}` is required")))
}
