//! HTTP surface.

mod discovery;
mod health;
mod mcp;
mod oauth;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, head, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::protocol::MAX_BODY_BYTES;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), require_auth);

    // HEAD /mcp is the unauthenticated probe; every other verb is guarded.
    let mcp_routes = head(mcp::probe).merge(
        get(mcp::stream)
            .post(mcp::stream)
            .delete(mcp::terminate)
            .route_layer(guard.clone()),
    );
    let sse_routes = get(mcp::stream).post(mcp::stream).route_layer(guard);

    Router::new()
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery::authorization_server),
        )
        .route(
            "/.well-known/oauth-authorization-server/{*rest}",
            get(discovery::authorization_server),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(discovery::protected_resource),
        )
        .route(
            "/.well-known/oauth-protected-resource/{*rest}",
            get(discovery::protected_resource),
        )
        .route("/authorize", get(oauth::authorize_query).post(oauth::authorize_form))
        .route("/token", post(oauth::token))
        .route("/mcp", mcp_routes)
        .route("/sse", sse_routes)
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
