use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{GatewayError, Tool, ToolDescriptor, ToolResult};
use crate::schema;

/// Name-keyed table of tools.
///
/// Backed by a `BTreeMap` so `list` is ordered by name and stable across runs.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration under the same name replaces it.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replacing previously registered tool");
        }
    }

    pub fn bulk_register(&mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors of all tools, optionally restricted to one ecosystem.
    pub fn list(&self, ecosystem: Option<&str>) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| t.descriptor())
            .filter(|d| ecosystem.map_or(true, |e| d.ecosystem == e))
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// Only an unknown name is an `Err`. Argument schema violations, tool
    /// errors and panics all come back as `Ok(ToolResult { status: Error, .. })`.
    pub fn execute(&self, name: &str, args: Map<String, Value>) -> Result<ToolResult, GatewayError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GatewayError::NotFound(name.to_string()))?;

        let descriptor = tool.descriptor();
        let instance = Value::Object(args);
        if let Err(e) = schema::validate_value(&descriptor.input_schema, &instance) {
            tracing::debug!(tool = %name, error = %e, "tool arguments rejected by schema");
            return Ok(ToolResult::error(format!("Invalid arguments for {name}: {e}"))
                .with_metadata("source", "validation"));
        }
        let empty = Map::new();
        let args = instance.as_object().unwrap_or(&empty);

        match std::panic::catch_unwind(AssertUnwindSafe(|| tool.invoke(args))) {
            Ok(Ok(output)) => Ok(output.into()),
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, error = %e, "tool execution failed");
                Ok(ToolResult::error(e.to_string()).with_metadata("source", "error"))
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(tool = %name, panic = %detail, "tool panicked");
                Ok(ToolResult::error(format!("Tool '{name}' failed unexpectedly"))
                    .with_metadata("source", "panic"))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
