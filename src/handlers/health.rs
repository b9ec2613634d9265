use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::{Tool, ToolDescriptor, ToolError, ToolOutput};

pub fn build_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(Health)]
}

/// `system.health`: always ok while the process is serving.
pub struct Health;

impl Tool for Health {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("system.health", "Report server liveness", "system")
    }

    fn invoke(&self, _args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::new(json!({
            "status": "ok",
            "server": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })))
    }
}
