//! Unload request fan-out and response aggregation
//!
//! Sends one unload command per replica to the node hosting it and
//! correlates the response (or timeout) back to that replica. Requests
//! are grouped under a tracking key so unrelated concurrent batch
//! operations do not drain each other's responses.

use crate::error::{AdminError, Result};
use crate::metrics::{record_unload_failure, record_unload_request};
use crate::types::UnloadCoreRequest;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Node-level core administration, consumed at its interface boundary
#[async_trait]
pub trait CoreAdminApi: Send + Sync {
    /// Ask a node to unload one core
    async fn unload_core(&self, node: &str, request: UnloadCoreRequest) -> Result<()>;
}

/// Result of one unload request, correlated back to its replica
#[derive(Debug)]
pub struct UnloadOutcome {
    /// Replica the request was issued for
    pub replica: String,

    /// Node the request was sent to
    pub node: String,

    /// Per-node success or failure
    pub result: Result<()>,
}

struct PendingUnload {
    replica: String,
    node: String,
    handle: JoinHandle<Result<()>>,
}

/// Fan-out dispatcher for unload commands
pub struct ShardRequestDispatcher {
    api: Arc<dyn CoreAdminApi>,
    request_timeout: Duration,
    pending: Mutex<HashMap<String, Vec<PendingUnload>>>,
}

impl ShardRequestDispatcher {
    /// Create a dispatcher over a node-admin client
    pub fn new(api: Arc<dyn CoreAdminApi>, request_timeout: Duration) -> Self {
        Self {
            api,
            request_timeout,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Send an unload request for one replica, tracked under `group`
    ///
    /// Returns immediately; the response is awaited by `collect`.
    pub fn dispatch(&self, group: &str, node: &str, replica: &str, request: UnloadCoreRequest) {
        debug!(
            "dispatching unload of core {} to node {} (group {})",
            request.core, node, group
        );
        record_unload_request(node);

        let api = Arc::clone(&self.api);
        let timeout = self.request_timeout;
        let target = node.to_string();
        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, api.unload_core(&target, request)).await {
                Ok(result) => result,
                Err(_) => Err(AdminError::Timeout(format!(
                    "unload request to node {} timed out",
                    target
                ))),
            }
        });

        self.pending
            .lock()
            .entry(group.to_string())
            .or_default()
            .push(PendingUnload {
                replica: replica.to_string(),
                node: node.to_string(),
                handle,
            });
    }

    /// Await every outstanding request in `group`
    ///
    /// Blocks until all of the group's requests complete or error. An
    /// unknown group collects to an empty set.
    pub async fn collect(&self, group: &str) -> Vec<UnloadOutcome> {
        let pending = self.pending.lock().remove(group).unwrap_or_default();

        let outcomes = join_all(pending.into_iter().map(|p| async move {
            let result = match p.handle.await {
                Ok(result) => result,
                Err(e) => Err(AdminError::ServerError(format!(
                    "unload task for replica {} failed: {}",
                    p.replica, e
                ))),
            };
            UnloadOutcome {
                replica: p.replica,
                node: p.node,
                result,
            }
        }))
        .await;

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                record_unload_failure(&outcome.node, e.error_type());
            }
        }
        outcomes
    }

    /// Number of requests still pending in `group`
    pub fn pending_count(&self, group: &str) -> usize {
        self.pending.lock().get(group).map_or(0, |v| v.len())
    }
}
