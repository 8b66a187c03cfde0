//! In-flight client requests and their cancellation tokens.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use easymcp::{McpError, McpResult, RequestId};

/// One job per in-flight client request, keyed by request id.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request. An id that is already in flight is rejected.
    pub async fn register(&self, id: RequestId, token: CancellationToken) -> McpResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&id) {
            return Err(McpError::DuplicateRequestId(id));
        }
        jobs.insert(id, token);
        Ok(())
    }

    pub async fn unregister(&self, id: &RequestId) {
        self.jobs.lock().await.remove(id);
    }

    /// Trigger and forget a job. Returns whether one was registered.
    pub async fn cancel(&self, id: &RequestId) -> bool {
        match self.jobs.lock().await.remove(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: &RequestId) -> bool {
        self.jobs.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
