//! CRM bundle (`gohighlevel.*`).
//!
//! Serves a fixed sample contact book until live API credentials are wired in.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::{required_str, str_arg, Tool, ToolDescriptor, ToolError, ToolOutput};

const ECOSYSTEM: &str = "gohighlevel";
const CREDENTIALS: &[&str] = &["GHL_API_KEY", "GHL_LOCATION_ID"];

pub fn build_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(ListContacts), Arc::new(GetContact)]
}

fn sample_contacts() -> Vec<Value> {
    vec![
        json!({"id": "c-1001", "name": "Ada Park", "email": "ada@parkworks.example", "tags": ["lead"]}),
        json!({"id": "c-1002", "name": "Ben Ortiz", "email": "ben@ortiz.example", "tags": ["customer"]}),
        json!({"id": "c-1003", "name": "Chloe Nwosu", "email": "chloe@nwosu.example", "tags": ["customer", "vip"]}),
        json!({"id": "c-1004", "name": "Dev Raman", "email": "dev@raman.example", "tags": []}),
    ]
}

pub struct ListContacts;

impl Tool for ListContacts {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "gohighlevel.list_contacts",
            "List CRM contacts, optionally filtered by a name or email substring",
            ECOSYSTEM,
        )
        .with_credentials(CREDENTIALS)
        .with_schema(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100 }
            },
            "additionalProperties": false
        }))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let query = str_arg(args, "query").map(str::to_lowercase);
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize);

        let matched: Vec<Value> = sample_contacts()
            .into_iter()
            .filter(|c| match &query {
                Some(q) => ["name", "email"].iter().any(|field| {
                    c[*field]
                        .as_str()
                        .is_some_and(|s| s.to_lowercase().contains(q.as_str()))
                }),
                None => true,
            })
            .collect();

        let total = matched.len();
        let contacts: Vec<Value> = match limit {
            Some(n) => matched.into_iter().take(n).collect(),
            None => matched,
        };
        let truncated = contacts.len() < total;

        Ok(ToolOutput::new(json!({ "contacts": contacts, "total": total }))
            .meta("source", "sample")
            .partial(truncated))
    }
}

pub struct GetContact;

impl Tool for GetContact {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("gohighlevel.get_contact", "Fetch one CRM contact by id", ECOSYSTEM)
            .with_credentials(CREDENTIALS)
            .with_schema(json!({
                "type": "object",
                "properties": { "contact_id": { "type": "string", "minLength": 1 } },
                "required": ["contact_id"]
            }))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let id = required_str(args, "contact_id")?;
        sample_contacts()
            .into_iter()
            .find(|c| c["id"] == id)
            .map(|contact| ToolOutput::new(json!({ "contact": contact })).meta("source", "sample"))
            .ok_or_else(|| ToolError::Failed(format!("contact '{id}' not found")))
    }
}
