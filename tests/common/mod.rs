#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use mcp_stream_server::config::ServerConfig;
use mcp_stream_server::credentials::CredentialStore;
use mcp_stream_server::handlers::builtin_tools;
use mcp_stream_server::server::McpServer;
use mcp_stream_server::tools::{Tool, ToolDescriptor, ToolError, ToolOutput, ToolRegistry};

pub const API_KEY: &str = "test-api-key";

/// Sleeps on the blocking pool before answering.
pub struct Slow(pub Duration);

impl Tool for Slow {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("test.slow", "Answers after a delay", "test")
    }

    fn invoke(&self, _args: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        std::thread::sleep(self.0);
        Ok(ToolOutput::new(json!({ "done": true })))
    }
}

pub fn config() -> ServerConfig {
    ServerConfig {
        api_key: Some(API_KEY.into()),
        ..ServerConfig::default()
    }
}

/// Built-in tools plus `test.slow`.
pub fn server() -> McpServer {
    let mut registry = ToolRegistry::new();
    registry.bulk_register(builtin_tools());
    registry.register(Arc::new(Slow(Duration::from_millis(300))));
    McpServer::with_registry(config(), registry, CredentialStore::in_memory())
}

pub async fn send(router: &Router, req: Request<Body>) -> Response<Body> {
    router.clone().oneshot(req).await.unwrap()
}

pub fn mcp_post(body: &str) -> Request<Body> {
    Request::post("/mcp")
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Next chunk written to a streaming body.
pub async fn next_chunk(body: &mut Body) -> String {
    loop {
        let frame = body.frame().await.expect("stream ended").unwrap();
        if let Ok(data) = frame.into_data() {
            return String::from_utf8(data.to_vec()).unwrap();
        }
    }
}

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq)]
pub enum Sse {
    Event {
        id: u64,
        event: Option<String>,
        data: String,
    },
    Comment(String),
}

impl Sse {
    pub fn id(&self) -> Option<u64> {
        match self {
            Sse::Event { id, .. } => Some(*id),
            Sse::Comment(_) => None,
        }
    }

    pub fn json(&self) -> Value {
        match self {
            Sse::Event { data, .. } => serde_json::from_str(data).unwrap(),
            Sse::Comment(c) => panic!("comment has no payload: {c}"),
        }
    }
}

pub fn parse_sse(text: &str) -> Vec<Sse> {
    text.split("\n\n")
        .filter(|block| !block.is_empty())
        .map(|block| {
            if let Some(comment) = block.strip_prefix(':') {
                return Sse::Comment(comment.trim().to_string());
            }
            let mut id = None;
            let mut event = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("id: ") {
                    id = Some(v.parse().unwrap());
                } else if let Some(v) = line.strip_prefix("event: ") {
                    event = Some(v.to_string());
                } else if let Some(v) = line.strip_prefix("data: ") {
                    data = v.to_string();
                }
            }
            Sse::Event {
                id: id.expect("event without id"),
                event,
                data,
            }
        })
        .collect()
}

/// Payload-bearing events after the priming and endpoint events.
pub fn messages(events: &[Sse]) -> Vec<Value> {
    events
        .iter()
        .filter(|e| e.id().is_some_and(|id| id >= 2))
        .map(Sse::json)
        .collect()
}
