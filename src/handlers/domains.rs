//! Domain registrar bundle (`godaddy.*`).

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::{required_str, Tool, ToolDescriptor, ToolError, ToolOutput};

const ECOSYSTEM: &str = "godaddy";
const CREDENTIALS: &[&str] = &["GODADDY_API_KEY", "GODADDY_API_SECRET"];

const REGISTERED: &[(&str, &str)] = &[
    ("parkworks.example", "2027-03-14"),
    ("ortiz-landscaping.example", "2026-12-01"),
];

pub fn build_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(ListDomains), Arc::new(CheckAvailability)]
}

pub struct ListDomains;

impl Tool for ListDomains {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("godaddy.list_domains", "List domains on the account", ECOSYSTEM)
            .with_credentials(CREDENTIALS)
    }

    fn invoke(&self, _args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let domains: Vec<Value> = REGISTERED
            .iter()
            .map(|(domain, expires)| json!({ "domain": domain, "expires": expires }))
            .collect();
        Ok(ToolOutput::new(json!({ "domains": domains })).meta("source", "sample"))
    }
}

pub struct CheckAvailability;

impl Tool for CheckAvailability {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "godaddy.check_availability",
            "Check whether a domain name can be registered",
            ECOSYSTEM,
        )
        .with_credentials(CREDENTIALS)
        .with_schema(json!({
            "type": "object",
            "properties": { "domain": { "type": "string", "minLength": 3 } },
            "required": ["domain"]
        }))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let domain = required_str(args, "domain")?.trim().to_lowercase();
        if !domain.contains('.') {
            return Err(ToolError::InvalidArguments(format!(
                "'{domain}' is not a fully qualified domain name"
            )));
        }
        let available = !REGISTERED.iter().any(|(d, _)| *d == domain);
        Ok(
            ToolOutput::new(json!({ "domain": domain, "available": available }))
                .meta("source", "sample"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn registered_domain_is_unavailable() {
        let out = CheckAvailability
            .invoke(&args(json!({"domain": "ParkWorks.example"})))
            .unwrap();
        assert_eq!(out.data["available"], false);
    }

    #[test]
    fn bare_label_is_rejected() {
        let err = CheckAvailability.invoke(&args(json!({"domain": "localhost"}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
