//! Server-initiated requests awaiting a client reply.
//!
//! Sampling, roots listing and elicitation share one id space and one pending
//! map. Each entry remembers its kind through the typed sender it holds, so a
//! reply is decoded into exactly the shape its caller is waiting for.
//!
//! Every entry is settled at most once: by a client reply, by a client error
//! reply, or by its waiter giving up (timeout or cancellation). Whichever
//! happens first removes it from the map.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use easymcp::response::{CreateMessageResult, ElicitResult, Root, RootsListResult};
use easymcp::{JsonRpcErrorObject, McpError, McpResult, RequestId};

pub type Reply<T> = oneshot::Sender<McpResult<T>>;

/// What a pending entry is waiting for, with the sender that settles it.
#[derive(Debug)]
pub enum Settle {
    Completion(Reply<CreateMessageResult>),
    Roots(Reply<Vec<Root>>),
    Elicitation(Reply<ElicitResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationKind {
    Completion,
    Roots,
    Elicitation,
}

impl Settle {
    pub fn kind(&self) -> CorrelationKind {
        match self {
            Settle::Completion(_) => CorrelationKind::Completion,
            Settle::Roots(_) => CorrelationKind::Roots,
            Settle::Elicitation(_) => CorrelationKind::Elicitation,
        }
    }

    /// Decode `result` for this kind and hand it to the waiter.
    fn resolve(self, result: Value) {
        match self {
            Settle::Completion(tx) => {
                let _ = tx.send(decode(result));
            }
            Settle::Roots(tx) => {
                let _ = tx.send(decode::<RootsListResult>(result).map(|r| r.roots));
            }
            Settle::Elicitation(tx) => {
                let _ = tx.send(decode(result));
            }
        }
    }

    fn reject(self, error: McpError) {
        match self {
            Settle::Completion(tx) => {
                let _ = tx.send(Err(error));
            }
            Settle::Roots(tx) => {
                let _ = tx.send(Err(error));
            }
            Settle::Elicitation(tx) => {
                let _ = tx.send(Err(error));
            }
        }
    }
}

fn decode<T: DeserializeOwned>(result: Value) -> McpResult<T> {
    serde_json::from_value(result)
        .map_err(|e| McpError::InvalidParams(format!("Malformed client reply: {e}")))
}

#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: Mutex<HashMap<RequestId, Settle>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending entry and return the receiving half.
    ///
    /// `wrap` is the [`Settle`] variant for the expected reply, e.g. `Settle::Roots`.
    pub async fn open<T>(
        &self,
        id: RequestId,
        wrap: fn(Reply<T>) -> Settle,
    ) -> oneshot::Receiver<McpResult<T>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, wrap(tx));
        rx
    }

    /// Await a reply, giving up after `timeout` or when `cancel` fires.
    pub async fn wait<T>(
        &self,
        id: &RequestId,
        rx: oneshot::Receiver<McpResult<T>>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> McpResult<T> {
        tokio::select! {
            reply = rx => reply.unwrap_or_else(|_| {
                Err(McpError::InternalError(format!("Request '{id}' was dropped")))
            }),
            _ = tokio::time::sleep(timeout) => {
                self.discard(id).await;
                tracing::debug!("Client did not answer request {id} in time");
                Err(McpError::RequestTimedOut)
            }
            _ = cancel.cancelled() => {
                self.discard(id).await;
                Err(McpError::RequestCancelled)
            }
        }
    }

    /// Settle the entry for `id` with a client result.
    pub async fn resolve(&self, id: &RequestId, result: Value) -> McpResult<CorrelationKind> {
        let settle = self.take(id).await?;
        let kind = settle.kind();
        settle.resolve(result);
        Ok(kind)
    }

    /// Settle the entry for `id` with a client error reply.
    pub async fn reject(
        &self,
        id: &RequestId,
        error: JsonRpcErrorObject,
    ) -> McpResult<CorrelationKind> {
        let settle = self.take(id).await?;
        let kind = settle.kind();
        settle.reject(McpError::Rpc(error));
        Ok(kind)
    }

    /// Drop an entry without settling it.
    pub async fn discard(&self, id: &RequestId) -> bool {
        self.pending.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn take(&self, id: &RequestId) -> McpResult<Settle> {
        self.pending
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| McpError::UnmatchedResponse(id.clone()))
    }
}
