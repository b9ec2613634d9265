use mcp_stream_server::handlers::builtin_tools;
use mcp_stream_server::schema::{validate_json, validate_value, SchemaValidationError};
use serde_json::json;

#[test]
fn json_schema_harness_validates_instance() {
    let schema = r#"{
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "type": "object",
      "required": ["contact_id"],
      "properties": {
        "contact_id": { "type": "string", "minLength": 1 }
      }
    }"#;

    validate_json(schema, r#"{ "contact_id": "c-1001" }"#).expect("schema validation failed");

    let err = validate_json(schema, r#"{ "contact_id": "" }"#).unwrap_err();
    assert!(matches!(err, SchemaValidationError::ValidationFailed(_)));
}

#[test]
fn every_builtin_input_schema_compiles() {
    for tool in builtin_tools() {
        let descriptor = tool.descriptor();
        // An empty argument object is either accepted or rejected, never a compile error.
        match validate_value(&descriptor.input_schema, &json!({})) {
            Ok(()) | Err(SchemaValidationError::ValidationFailed(_)) => {}
            Err(e) => panic!("{}: schema does not compile: {e}", descriptor.name),
        }
    }
}
