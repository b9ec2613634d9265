//! Cloud VM bundle (`digitalocean.*`).

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::{str_arg, Tool, ToolDescriptor, ToolError, ToolOutput};

pub fn build_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(ListDroplets)]
}

pub struct ListDroplets;

impl Tool for ListDroplets {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "digitalocean.list_droplets",
            "List droplets, optionally in a single region",
            "digitalocean",
        )
        .with_credentials(&["DIGITALOCEAN_TOKEN"])
        .with_schema(json!({
            "type": "object",
            "properties": { "region": { "type": "string" } }
        }))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let region = str_arg(args, "region");
        let droplets: Vec<Value> = [
            json!({"id": 301, "name": "web-1", "region": "nyc3", "status": "active", "memory_mb": 2048}),
            json!({"id": 302, "name": "worker-1", "region": "nyc3", "status": "active", "memory_mb": 4096}),
            json!({"id": 303, "name": "staging", "region": "ams3", "status": "off", "memory_mb": 1024}),
        ]
        .into_iter()
        .filter(|d| region.map_or(true, |r| d["region"] == r))
        .collect();

        Ok(ToolOutput::new(json!({ "droplets": droplets })).meta("source", "sample"))
    }
}
