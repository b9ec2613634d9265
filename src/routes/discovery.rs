use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::oauth::discovery;
use crate::state::AppState;

pub async fn authorization_server(State(state): State<AppState>) -> Json<Value> {
    Json(discovery::authorization_server_metadata(&state.config))
}

pub async fn protected_resource(State(state): State<AppState>) -> Json<Value> {
    Json(discovery::protected_resource_metadata(&state.config))
}
