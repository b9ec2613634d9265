use bytes::Bytes;
use serde_json::json;

use crate::protocol::JsonRpcResponse;

/// Wire encoding chosen per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `text/event-stream`.
    Sse,
    /// Newline-delimited JSON for plain legacy `GET` clients.
    Ndjson,
}

impl Framing {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Sse => "text/event-stream",
            Self::Ndjson => "application/x-ndjson",
        }
    }
}

/// One unit written to the outbound stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Priming { id: u64 },
    Endpoint { id: u64, uri: String },
    Message { id: u64, payload: JsonRpcResponse },
    /// Carries no id and no payload.
    Heartbeat,
}

impl StreamEvent {
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Priming { id } | Self::Endpoint { id, .. } | Self::Message { id, .. } => Some(*id),
            Self::Heartbeat => None,
        }
    }

    pub fn encode(&self, framing: Framing) -> Bytes {
        match framing {
            Framing::Sse => self.encode_sse(),
            Framing::Ndjson => self.encode_ndjson(),
        }
    }

    fn encode_sse(&self) -> Bytes {
        let frame = match self {
            Self::Priming { id } => format!("id: {id}\ndata: \n\n"),
            Self::Endpoint { id, uri } => format!("id: {id}\nevent: endpoint\ndata: {uri}\n\n"),
            Self::Message { id, payload } => format!("id: {id}\ndata: {}\n\n", payload_json(payload)),
            Self::Heartbeat => ": heartbeat\n\n".to_string(),
        };
        Bytes::from(frame)
    }

    fn encode_ndjson(&self) -> Bytes {
        let line = match self {
            Self::Priming { .. } => json!({
                "jsonrpc": "2.0",
                "method": "server/initialized",
                "params": {}
            })
            .to_string(),
            Self::Endpoint { uri, .. } => json!({
                "jsonrpc": "2.0",
                "method": "notifications/endpoint",
                "params": { "uri": uri }
            })
            .to_string(),
            Self::Message { payload, .. } => payload_json(payload),
            Self::Heartbeat => String::new(),
        };
        Bytes::from(line + "\n")
    }
}

fn payload_json(payload: &JsonRpcResponse) -> String {
    serde_json::to_string(payload).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response");
        json!({
            "jsonrpc": "2.0",
            "id": payload.id,
            "error": { "code": -32603, "message": "Response serialization failed" }
        })
        .to_string()
    })
}
