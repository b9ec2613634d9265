use std::collections::HashMap;
use std::future::Future;

use tokio::task::{Id, JoinSet};

use crate::protocol::{JsonRpcError, JsonRpcResponse, RpcId};

/// Per-connection set of in-flight calls.
///
/// Every submitted call yields exactly one response from [`next_completed`],
/// in completion order. A call whose task panics is answered with -32603
/// under its own id. Dropping the correlator aborts everything still running.
///
/// [`next_completed`]: Correlator::next_completed
#[derive(Default)]
pub struct Correlator {
    tasks: JoinSet<JsonRpcResponse>,
    pending: HashMap<Id, Option<RpcId>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit<F>(&mut self, id: Option<RpcId>, call: F)
    where
        F: Future<Output = JsonRpcResponse> + Send + 'static,
    {
        let handle = self.tasks.spawn(call);
        self.pending.insert(handle.id(), id);
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Next finished call, or `None` once nothing is in flight.
    pub async fn next_completed(&mut self) -> Option<JsonRpcResponse> {
        loop {
            match self.tasks.join_next_with_id().await? {
                Ok((task_id, resp)) => {
                    self.pending.remove(&task_id);
                    return Some(resp);
                }
                Err(e) => {
                    let id = self.pending.remove(&e.id()).flatten();
                    if e.is_cancelled() {
                        tracing::debug!(id = ?id, "call cancelled");
                        continue;
                    }
                    tracing::error!(id = ?id, error = %e, "call task panicked");
                    return Some(JsonRpcResponse::error(
                        id,
                        JsonRpcError::internal_error("Internal error while handling request"),
                    ));
                }
            }
        }
    }

    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ok(id: i64) -> JsonRpcResponse {
        JsonRpcResponse::success(Some(RpcId::Number(id)), serde_json::json!({}))
    }

    #[tokio::test(start_paused = true)]
    async fn completion_order_not_submission_order() {
        let mut c = Correlator::new();
        c.submit(Some(RpcId::Number(1)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            ok(1)
        });
        c.submit(Some(RpcId::Number(2)), async { ok(2) });
        assert_eq!(c.in_flight(), 2);

        let first = c.next_completed().await.unwrap();
        let second = c.next_completed().await.unwrap();
        assert_eq!(first.id, Some(RpcId::Number(2)));
        assert_eq!(second.id, Some(RpcId::Number(1)));
        assert!(c.next_completed().await.is_none());
        assert_eq!(c.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_call_is_answered_under_its_id() {
        let mut c = Correlator::new();
        c.submit(Some(RpcId::Str("p".into())), async {
            if true {
                panic!("tool blew up");
            }
            ok(0)
        });
        let resp = c.next_completed().await.unwrap();
        assert_eq!(resp.id, Some(RpcId::Str("p".into())));
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn aborted_calls_produce_nothing() {
        let mut c = Correlator::new();
        c.submit(Some(RpcId::Number(1)), std::future::pending());
        c.abort_all();
        assert!(c.next_completed().await.is_none());
    }
}
