//! Convergence polling against the metadata store
//!
//! A topology mutation is only considered done once it is observable in
//! the store. The waiter re-reads the store at a bounded interval until
//! the replica entry is absent or the timeout elapses; timing out is not
//! an error here — the caller decides whether it is fatal.

use crate::error::{AdminError, Result};
use crate::metadata::MetadataStore;
use crate::metrics::record_convergence_wait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Polls the metadata store for replica absence
pub struct ConvergenceWaiter {
    store: Arc<dyn MetadataStore>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl ConvergenceWaiter {
    /// Create a waiter polling at `poll_interval`
    pub fn new(
        store: Arc<dyn MetadataStore>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            poll_interval,
            shutdown,
        }
    }

    /// Wait until the replica entry is absent or `timeout` elapses
    ///
    /// Returns `Ok(false)` on timeout. Cancellation while waiting
    /// surfaces as `Interrupted` so the surrounding flow can record a
    /// failure outcome for this replica instead of crashing the batch.
    pub async fn await_absence(
        &self,
        collection: &str,
        shard: &str,
        replica: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            let snapshot = self.store.cluster_state().await?;
            if Self::is_absent(&snapshot, collection, shard, replica) {
                debug!(
                    "replica {}/{}/{} absent at store version {}",
                    collection, shard, replica, snapshot.version
                );
                record_convergence_wait("converged", started.elapsed());
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                record_convergence_wait("timeout", started.elapsed());
                return Ok(false);
            }

            let sleep = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    record_convergence_wait("interrupted", started.elapsed());
                    return Err(AdminError::Interrupted(format!(
                        "interrupted while waiting for removal of {}/{}/{}",
                        collection, shard, replica
                    )));
                }
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }

    fn is_absent(
        snapshot: &crate::types::ClusterStateSnapshot,
        collection: &str,
        shard: &str,
        replica: &str,
    ) -> bool {
        match snapshot
            .collections
            .get(collection)
            .and_then(|c| c.shard(shard))
        {
            Some(shard_ref) => shard_ref.replica(replica).is_none(),
            // Collection or shard gone entirely: the entry cannot exist
            None => true,
        }
    }
}
