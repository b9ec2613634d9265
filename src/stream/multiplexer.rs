use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::correlator::Correlator;
use super::event::StreamEvent;
use crate::handlers::Dispatcher;
use crate::protocol::{InboundMessage, JsonRpcError, JsonRpcResponse};

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Streaming,
    Closing,
    Closed,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

/// Per-connection stream settings.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub heartbeat_interval: Duration,
    /// Announced in the endpoint event.
    pub endpoint_uri: String,
    /// For log correlation only.
    pub session_id: Option<String>,
    /// The request body was empty: stay open until the client leaves
    /// instead of closing once every call is answered.
    pub listening: bool,
}

enum Outbound {
    Response(JsonRpcResponse),
    End,
}

/// Aborts the dispatch task when the connection goes away.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owns one connection's outbound event sequence.
///
/// Event ids start at 0 (priming) and 1 (endpoint), then one id per
/// response in completion order. Heartbeats consume no id. A connection
/// whose body held messages ends once every call has been answered; a
/// listening connection (empty body) only ends when the client leaves.
pub struct Multiplexer {
    phase: Phase,
    next_id: u64,
    options: StreamOptions,
    rx: mpsc::Receiver<Outbound>,
    dispatch: AbortOnDrop,
}

impl Multiplexer {
    /// Start processing `messages` in the background and return the stream
    /// owner in the `Opening` phase.
    pub fn open(
        dispatcher: Arc<Dispatcher>,
        messages: Vec<InboundMessage>,
        options: StreamOptions,
    ) -> Self {
        tracing::debug!(
            session_id = options.session_id.as_deref().unwrap_or("-"),
            messages = messages.len(),
            phase = Phase::Opening.as_str(),
            "stream state"
        );
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let handle = tokio::spawn(run_dispatch(dispatcher, messages, options.listening, tx));
        Self {
            phase: Phase::Opening,
            next_id: 0,
            options,
            rx,
            dispatch: AbortOnDrop(handle),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send + 'static {
        stream::unfold(self, |mut mux| async move {
            let event = mux.next_event().await?;
            Some((event, mux))
        })
    }

    /// Produce the next event, or `None` once the stream is closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.phase {
                Phase::Opening if self.next_id == 0 => {
                    return Some(StreamEvent::Priming { id: self.take_id() });
                }
                Phase::Opening => {
                    let event = StreamEvent::Endpoint {
                        id: self.take_id(),
                        uri: self.options.endpoint_uri.clone(),
                    };
                    self.transition(Phase::Streaming);
                    return Some(event);
                }
                Phase::Streaming => {
                    match tokio::time::timeout(self.options.heartbeat_interval, self.rx.recv())
                        .await
                    {
                        Ok(Some(Outbound::Response(payload))) => {
                            return Some(StreamEvent::Message {
                                id: self.take_id(),
                                payload,
                            });
                        }
                        Ok(Some(Outbound::End)) | Ok(None) => self.transition(Phase::Closing),
                        Err(_) => return Some(StreamEvent::Heartbeat),
                    }
                }
                Phase::Closing => {
                    self.dispatch.0.abort();
                    self.rx.close();
                    self.transition(Phase::Closed);
                }
                Phase::Closed => return None,
            }
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn transition(&mut self, to: Phase) {
        tracing::debug!(
            session_id = self.options.session_id.as_deref().unwrap_or("-"),
            from = self.phase.as_str(),
            to = to.as_str(),
            "stream state"
        );
        self.phase = to;
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        if self.phase != Phase::Closed {
            tracing::debug!(
                session_id = self.options.session_id.as_deref().unwrap_or("-"),
                from = self.phase.as_str(),
                "client disconnected, cancelling outstanding calls"
            );
        }
    }
}

async fn run_dispatch(
    dispatcher: Arc<Dispatcher>,
    messages: Vec<InboundMessage>,
    listening: bool,
    tx: mpsc::Sender<Outbound>,
) {
    let mut correlator = Correlator::new();

    for message in messages {
        match message {
            InboundMessage::Rejected(resp) => {
                if tx.send(Outbound::Response(resp)).await.is_err() {
                    return;
                }
            }
            InboundMessage::Notification(req) => {
                dispatcher.dispatch(req).await;
            }
            InboundMessage::Call(req) => {
                let id = req.id.clone();
                let dispatcher = Arc::clone(&dispatcher);
                correlator.submit(id.clone(), async move {
                    match dispatcher.dispatch(req).await {
                        Some(resp) => resp,
                        None => JsonRpcResponse::error(
                            id,
                            JsonRpcError::internal_error("Call produced no response"),
                        ),
                    }
                });
            }
        }
    }

    while let Some(resp) = correlator.next_completed().await {
        if tx.send(Outbound::Response(resp)).await.is_err() {
            // Receiver gone: dropping the correlator aborts the rest.
            return;
        }
    }

    if listening {
        tx.closed().await;
    } else {
        let _ = tx.send(Outbound::End).await;
    }
}
