use axum::Json;
use serde_json::{json, Value};

/// Unauthenticated liveness.
pub async fn health() -> Json<Value> {
    Json(json!({ "app": env!("CARGO_PKG_NAME"), "status": "ok" }))
}
