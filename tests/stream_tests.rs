//! End-to-end tests of the streaming endpoint through the axum router.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};

use common::{body_text, mcp_post, messages, next_chunk, parse_sse, send, server, Sse, API_KEY};

#[tokio::test]
async fn initialize_opens_session_and_answers_after_priming_and_endpoint() {
    let server = server();
    let router = server.router();
    let resp = send(
        &router,
        mcp_post(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"x"}}}"#),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers["x-accel-buffering"], "no");
    let session_id = headers["mcp-session-id"].to_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&session_id).is_ok());
    assert_eq!(server.state().sessions.len(), 1);

    let events = parse_sse(&body_text(resp).await);
    assert_eq!(
        events[0],
        Sse::Event { id: 0, event: None, data: String::new() }
    );
    assert_eq!(
        events[1],
        Sse::Event {
            id: 1,
            event: Some("endpoint".into()),
            data: "http://localhost:8000/mcp".into(),
        }
    );
    assert_eq!(events.len(), 3);
    let reply = events[2].json();
    assert_eq!(events[2].id(), Some(2));
    assert_eq!(reply["id"], 1);
    assert!(reply["result"]["protocolVersion"].is_string());

    let session = server.state().sessions.touch(&session_id).unwrap();
    assert_eq!(session.client_name(), Some("x"));
}

#[tokio::test]
async fn responses_arrive_in_completion_order() {
    let router = server().router();
    let body = [
        json!({"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"test.slow"}}).to_string(),
        json!({"jsonrpc":"2.0","id":1,"method":"tools/list"}).to_string(),
    ]
    .join("\n");

    let events = parse_sse(&body_text(send(&router, mcp_post(&body)).await).await);
    let replies = messages(&events);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["id"], 1, "fast call must not wait for the slow one");
    assert_eq!(replies[1]["id"], 2);
    assert_eq!(replies[1]["result"]["data"]["done"], true);
}

#[tokio::test]
async fn notification_produces_no_response() {
    let router = server().router();
    let resp = send(&router, mcp_post(r#"{"jsonrpc":"2.0","method":"notifications/foo"}"#)).await;
    assert!(resp.headers().get("mcp-session-id").is_none());

    let events = parse_sse(&body_text(resp).await);
    assert_eq!(events.len(), 2, "only priming and endpoint: {events:?}");
    assert!(messages(&events).is_empty());
}

#[tokio::test]
async fn unknown_tool_is_32601_and_other_calls_still_answered() {
    let router = server().router();
    let body = r#"[
        {"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"crm.nope"}},
        {"jsonrpc":"2.0","id":"b","method":"ping"}
    ]"#;
    let events = parse_sse(&body_text(send(&router, mcp_post(body)).await).await);
    let replies = messages(&events);
    assert_eq!(replies.len(), 2);

    let failed = replies.iter().find(|r| r["id"] == "a").unwrap();
    assert_eq!(failed["error"]["code"], -32601);
    let ok = replies.iter().find(|r| r["id"] == "b").unwrap();
    assert_eq!(ok["result"], json!({}));
}

#[tokio::test]
async fn n_calls_and_m_notifications_yield_n_events() {
    let router = server().router();
    let body = [
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        r#"this line is not json"#,
        r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{}}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"system.health"}}"#,
    ]
    .join("\n");

    let events = parse_sse(&body_text(send(&router, mcp_post(&body)).await).await);

    let ids: Vec<u64> = events.iter().filter_map(Sse::id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4], "event ids start at 0 with no gaps");

    let replies = messages(&events);
    assert_eq!(replies.len(), 3);
    let rpc_ids: HashSet<i64> = replies.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(rpc_ids, HashSet::from([1, 2, 3]));
}

#[tokio::test]
async fn unparseable_body_yields_single_parse_error() {
    let router = server().router();
    let events = parse_sse(&body_text(send(&router, mcp_post("{not json")).await).await);
    let replies = messages(&events);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[0]["error"]["code"], -32700);
}

#[tokio::test]
async fn invalid_jsonrpc_version_with_id_is_32600() {
    let router = server().router();
    let events = parse_sse(
        &body_text(send(&router, mcp_post(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#)).await).await,
    );
    let replies = messages(&events);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], 5);
    assert_eq!(replies[0]["error"]["code"], -32600);
}

#[tokio::test]
async fn body_without_usable_message_is_answered_and_closed() {
    let router = server().router();
    for (body, expected) in [("42", 1), ("[1,2]", 2), (r#"{"jsonrpc":"2.0"}"#, 1)] {
        let resp = send(&router, mcp_post(body)).await;
        let text = tokio::time::timeout(Duration::from_secs(5), body_text(resp))
            .await
            .unwrap_or_else(|_| panic!("{body}: stream never closed"));
        let replies = messages(&parse_sse(&text));
        assert_eq!(replies.len(), expected, "{body}");
        for reply in replies {
            assert_eq!(reply["id"], Value::Null);
            assert_eq!(reply["error"]["code"], -32600);
        }
    }
}

#[tokio::test]
async fn null_id_is_answered_with_null_id() {
    let router = server().router();
    let resp = send(&router, mcp_post(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)).await;
    let replies = messages(&parse_sse(&body_text(resp).await));
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], Value::Null);
    assert_eq!(replies[0]["result"], json!({}));
}

#[tokio::test]
async fn only_first_initialize_creates_a_session() {
    let server = server();
    let router = server.router();
    let body = r#"[
        {"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"first"}}},
        {"jsonrpc":"2.0","id":2,"method":"initialize","params":{"clientInfo":{"name":"second"}}}
    ]"#;
    let resp = send(&router, mcp_post(body)).await;
    let session_id = resp.headers()["mcp-session-id"].to_str().unwrap().to_string();

    let replies = messages(&parse_sse(&body_text(resp).await));
    assert_eq!(replies.len(), 2, "both initialize calls are answered");
    assert!(replies.iter().all(|r| r.get("result").is_some()));

    assert_eq!(server.state().sessions.len(), 1);
    let session = server.state().sessions.touch(&session_id).unwrap();
    assert_eq!(session.client_name(), Some("first"));
}

#[tokio::test]
async fn known_session_is_reused_and_unknown_is_tolerated() {
    let server = server();
    let router = server.router();
    let resp = send(&router, mcp_post(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)).await;
    let session_id = resp.headers()["mcp-session-id"].to_str().unwrap().to_string();
    body_text(resp).await;

    let mut req = mcp_post(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
    req.headers_mut().insert("mcp-session-id", session_id.parse().unwrap());
    let resp = send(&router, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("mcp-session-id").is_none());
    body_text(resp).await;

    let mut req = mcp_post(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#);
    req.headers_mut().insert("mcp-session-id", "not-a-session".parse().unwrap());
    let resp = send(&router, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(messages(&parse_sse(&body_text(resp).await)).len(), 1);
    assert_eq!(server.state().sessions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_body_idles_on_heartbeats() {
    let router = server().router();
    let resp = send(&router, mcp_post("")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = resp.into_body();

    assert_eq!(next_chunk(&mut body).await, "id: 0\ndata: \n\n");
    assert!(next_chunk(&mut body).await.starts_with("id: 1\nevent: endpoint\n"));
    for _ in 0..3 {
        let chunk = next_chunk(&mut body).await;
        assert_eq!(chunk, ": heartbeat\n\n");
        assert!(serde_json::from_str::<Value>(chunk.trim_start_matches(':').trim()).is_err());
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeat_waits_for_the_interval() {
    let router = server().router();
    let mut body = send(&router, mcp_post("")).await.into_body();
    next_chunk(&mut body).await;
    next_chunk(&mut body).await;

    let start = tokio::time::Instant::now();
    next_chunk(&mut body).await;
    assert!(start.elapsed() >= Duration::from_secs(15));
}

#[tokio::test]
async fn plain_get_uses_ndjson_framing() {
    let router = server().router();
    let req = Request::get("/mcp")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let resp = send(&router, req).await;
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/x-ndjson");

    let mut body = resp.into_body();
    let first: Value = serde_json::from_str(next_chunk(&mut body).await.trim()).unwrap();
    assert_eq!(first["method"], "server/initialized");
    let second: Value = serde_json::from_str(next_chunk(&mut body).await.trim()).unwrap();
    assert_eq!(second["method"], "notifications/endpoint");
    assert_eq!(second["params"]["uri"], "http://localhost:8000/mcp");
}

#[tokio::test]
async fn get_with_event_stream_accept_uses_sse() {
    let router = server().router();
    let req = Request::get("/sse")
        .header("x-api-key", API_KEY)
        .header("accept", "text/event-stream")
        .body(Body::empty())
        .unwrap();
    let resp = send(&router, req).await;
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    let mut body = resp.into_body();
    assert_eq!(next_chunk(&mut body).await, "id: 0\ndata: \n\n");
}

#[tokio::test]
async fn legacy_sse_alias_accepts_post() {
    let router = server().router();
    let mut req = mcp_post(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
    *req.uri_mut() = "/sse".parse().unwrap();
    let replies = messages(&parse_sse(&body_text(send(&router, req).await).await));
    assert_eq!(replies[0]["id"], 1);
}

#[tokio::test]
async fn unauthenticated_stream_is_rejected_before_any_event() {
    let router = server().router();
    let req = Request::post("/mcp")
        .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
        .unwrap();
    let resp = send(&router, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert!(challenge.contains("resource_metadata=\"http://localhost:8000/.well-known/oauth-protected-resource\""));
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");

    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let router = server().router();
    let req = Request::post("/mcp")
        .header("x-api-key", "guess")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let router = server().router();
    let big = "x".repeat(mcp_stream_server::protocol::MAX_BODY_BYTES + 1);
    let resp = send(&router, mcp_post(&big)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn delete_terminates_session() {
    let server = server();
    let router = server.router();
    let resp = send(&router, mcp_post(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)).await;
    let session_id = resp.headers()["mcp-session-id"].to_str().unwrap().to_string();
    body_text(resp).await;

    let delete = |sid: Option<&str>| {
        let mut req = Request::delete("/mcp").header("x-api-key", API_KEY);
        if let Some(sid) = sid {
            req = req.header("mcp-session-id", sid);
        }
        req.body(Body::empty()).unwrap()
    };

    assert_eq!(send(&router, delete(None)).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(send(&router, delete(Some(&session_id))).await.status(), StatusCode::ACCEPTED);
    assert_eq!(send(&router, delete(Some(&session_id))).await.status(), StatusCode::NOT_FOUND);
    assert!(server.state().sessions.is_empty());
}
