//! Accounting bundle (`quickbooks.*`).

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::{str_arg, Tool, ToolDescriptor, ToolError, ToolOutput};

pub fn build_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(ListInvoices)]
}

pub struct ListInvoices;

impl Tool for ListInvoices {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "quickbooks.list_invoices",
            "List invoices, optionally restricted to one status",
            "quickbooks",
        )
        .with_credentials(&["QBO_ACCESS_TOKEN", "QBO_REALM_ID"])
        .with_schema(json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "enum": ["paid", "open", "overdue"] }
            }
        }))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let status = str_arg(args, "status");
        let invoices: Vec<Value> = [
            json!({"id": "INV-2041", "customer": "Ortiz Landscaping", "amount": 1250.00, "currency": "USD", "status": "paid"}),
            json!({"id": "INV-2042", "customer": "Nwosu Dental", "amount": 480.50, "currency": "USD", "status": "open"}),
            json!({"id": "INV-2043", "customer": "Park Works", "amount": 3100.00, "currency": "USD", "status": "overdue"}),
        ]
        .into_iter()
        .filter(|inv| status.map_or(true, |s| inv["status"] == s))
        .collect();

        let outstanding: f64 = invoices
            .iter()
            .filter(|inv| inv["status"] != "paid")
            .filter_map(|inv| inv["amount"].as_f64())
            .sum();

        Ok(
            ToolOutput::new(json!({ "invoices": invoices, "outstanding": outstanding }))
                .meta("source", "sample"),
        )
    }
}
