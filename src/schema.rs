use jsonschema::validator_for;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("Schema parse error: {0}")]
    SchemaParse(#[from] serde_json::Error),
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),
    #[error("{0}")]
    ValidationFailed(String),
}

/// Validate a JSON instance against a JSON Schema (draft 2020-12).
/// Returns Ok(()) if valid, Err otherwise.
pub fn validate_json(schema_str: &str, instance_str: &str) -> Result<(), SchemaValidationError> {
    let schema_json: Value = serde_json::from_str(schema_str)?;
    let instance_json: Value = serde_json::from_str(instance_str)?;
    validate_value(&schema_json, &instance_json)
}

/// Validate an already-parsed instance. The error carries the first
/// violation found.
pub fn validate_value(schema: &Value, instance: &Value) -> Result<(), SchemaValidationError> {
    let validator = validator_for(schema)
        .map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;

    let first = validator.iter_errors(instance).next().map(|e| e.to_string());
    match first {
        None => Ok(()),
        Some(msg) => Err(SchemaValidationError::ValidationFailed(msg)),
    }
}
