use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::Extension;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use crate::auth::AuthMethod;
use crate::handlers::client_info;
use crate::protocol::{parse_body, InboundMessage};
use crate::session::SESSION_HEADER;
use crate::state::AppState;
use crate::stream::{Framing, Multiplexer, StreamOptions};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// `HEAD /mcp`: 200 only for a live bearer token.
pub async fn probe(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.auth.probe(&headers).await {
        StatusCode::OK.into_response()
    } else {
        state.auth.unauthorized()
    }
}

/// The streaming endpoint (`GET|POST /mcp`, `/sse`).
///
/// Authentication has already passed and left its [`AuthMethod`] in the
/// request extensions. The body is parsed in full, a session
/// is minted if it holds an `initialize` call, and the rest happens on the
/// returned event stream.
pub async fn stream(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthMethod>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let framing = if method == Method::GET && !accepts_event_stream(&headers) {
        Framing::Ndjson
    } else {
        Framing::Sse
    };

    let messages = parse_body(&body);

    // Only the first initialize establishes a session.
    let created = messages
        .iter()
        .find_map(|m| match m {
            InboundMessage::Call(req) if req.method == "initialize" => Some(req),
            _ => None,
        })
        .map(|req| state.sessions.create(client_info(req)));

    let session_id = match &created {
        Some(session) => Some(session.session_id.clone()),
        None => existing_session(&state, &headers),
    };

    tracing::info!(
        method = %method,
        auth = auth.as_str(),
        messages = messages.len(),
        session_id = session_id.as_deref().unwrap_or("-"),
        framing = ?framing,
        "stream opened"
    );

    let mux = Multiplexer::open(
        Arc::clone(&state.dispatcher),
        messages,
        StreamOptions {
            heartbeat_interval: state.config.heartbeat_interval,
            endpoint_uri: state.config.mcp_endpoint(),
            session_id,
            listening: body.trim_ascii().is_empty(),
        },
    );
    let events = mux
        .into_stream()
        .map(move |event| Ok::<_, Infallible>(event.encode(framing)));

    let mut resp = Response::new(Body::from_stream(events));
    let h = resp.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static(framing.content_type()));
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    if let Some(session) = created {
        if let Ok(v) = HeaderValue::from_str(&session.session_id) {
            h.insert(SESSION_HEADER, v);
        }
    }
    resp
}

/// `DELETE /mcp`: explicit session termination.
pub async fn terminate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing mcp-session-id").into_response();
    };
    if state.sessions.remove(session_id) {
        tracing::info!(session_id, "session terminated by client");
        StatusCode::ACCEPTED.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Refresh the presented session, if any. Unknown ids proceed without one.
fn existing_session(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let presented = headers.get(SESSION_HEADER)?.to_str().ok()?;
    match state.sessions.touch(presented) {
        Some(session) => Some(session.session_id),
        None => {
            tracing::warn!(session_id = presented, "unknown or expired session, continuing without one");
            None
        }
    }
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/event-stream"))
}
