//! Delete-replica command execution
//!
//! Drives one replica removal through validation, placement verification,
//! unload dispatch, convergence polling and — when node-driven removal
//! does not appear in time — forced metadata repair:
//!
//! ```text
//! validated → placement-verified → dispatched → awaiting-convergence
//!           → converged | failed
//! ```
//!
//! Count-based requests select candidates per shard, verify every shard's
//! whole batch against placement policy, and only then start dispatching.
//! Sequential execution surfaces failures as errors; parallel execution
//! appends them to the shared report instead.

use crate::config::AdminConfig;
use crate::convergence::ConvergenceWaiter;
use crate::dispatch::{CoreAdminApi, ShardRequestDispatcher};
use crate::error::{AdminError, Result};
use crate::metadata::{AliasResolver, MetadataStore};
use crate::metrics::{record_forced_repair, record_replica_deletion};
use crate::placement::{verifier_from_config, PlacementVerifier};
use crate::selector;
use crate::state::ClusterStateView;
use crate::types::{DeleteReplicaRequest, DeletionReport, ReplicaState, UnloadCoreRequest};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Clean-up hook run exactly once when a replica's flow reaches a
/// terminal state, whatever that state is
pub type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

/// Runs the callback on drop, so it fires exactly once even when the
/// flow errors or panics
struct CompletionGuard {
    callback: Option<CompletionCallback>,
}

impl CompletionGuard {
    fn new(callback: Option<CompletionCallback>) -> Self {
        Self { callback }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

/// Concurrency-safe aggregator for a command's results
///
/// Written by parallel per-replica tasks; turned into an immutable
/// `DeletionReport` once the command completes.
#[derive(Default)]
struct ReportSink {
    inner: Mutex<DeletionReport>,
}

impl ReportSink {
    fn record_shard(&self, shard: &str, replicas: &BTreeSet<String>) {
        self.inner.lock().shards.push(crate::types::ShardDeletionResult {
            shard_id: shard.to_string(),
            replicas_deleted: replicas.iter().cloned().collect(),
        });
    }

    fn record_failure(&self, replica: &str, node: Option<&str>, message: String) {
        self.inner.lock().failures.push(crate::types::FailureRecord {
            replica: replica.to_string(),
            node: node.map(|n| n.to_string()),
            message,
        });
    }

    fn record_forced(&self, qualified: String) {
        self.inner.lock().forced_removals.push(qualified);
    }

    fn snapshot(&self) -> DeletionReport {
        self.inner.lock().clone()
    }
}

/// Executes delete-replica commands against the cluster
#[derive(Clone)]
pub struct DeleteExecutor {
    store: Arc<dyn MetadataStore>,
    aliases: Arc<dyn AliasResolver>,
    verifier: Arc<dyn PlacementVerifier>,
    dispatcher: Arc<ShardRequestDispatcher>,
    waiter: Arc<ConvergenceWaiter>,
    config: AdminConfig,
    shutdown: CancellationToken,
}

impl DeleteExecutor {
    /// Create an executor over the injected collaborators
    pub fn new(
        store: Arc<dyn MetadataStore>,
        aliases: Arc<dyn AliasResolver>,
        core_admin: Arc<dyn CoreAdminApi>,
        config: AdminConfig,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let dispatcher = Arc::new(ShardRequestDispatcher::new(
            core_admin,
            config.request_timeout(),
        ));
        let waiter = Arc::new(ConvergenceWaiter::new(
            Arc::clone(&store),
            config.poll_interval(),
            shutdown.clone(),
        ));
        let verifier = verifier_from_config(&config.placement);
        Self {
            store,
            aliases,
            verifier,
            dispatcher,
            waiter,
            config,
            shutdown,
        }
    }

    /// Replace the configured placement verifier
    pub fn with_verifier(mut self, verifier: Arc<dyn PlacementVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Cancel in-flight convergence waits; waiting flows report
    /// `Interrupted` failures for their replicas
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Execute a delete-replica command
    ///
    /// Sequential single-replica requests fail with an error; parallel
    /// and count-based requests embed per-replica failures in the report.
    pub async fn execute(&self, request: &DeleteReplicaRequest) -> Result<DeletionReport> {
        self.execute_with_callback(request, None).await
    }

    /// Execute with a per-replica completion hook (used by callers that
    /// track async operation slots)
    pub async fn execute_with_callback(
        &self,
        request: &DeleteReplicaRequest,
        on_complete: Option<CompletionCallback>,
    ) -> Result<DeletionReport> {
        debug!(
            "delete_replica: {}",
            serde_json::to_string(request).unwrap_or_default()
        );

        let collection = if request.follow_aliases {
            self.aliases.resolve(&request.collection).await?
        } else {
            request.collection.clone()
        };

        let view = Arc::new(ClusterStateView::new(self.store.cluster_state().await?));
        let sink = Arc::new(ReportSink::default());

        if request.count.is_some() {
            self.delete_by_count(&view, &collection, request, &sink, on_complete)
                .await?;
            return Ok(sink.snapshot());
        }

        let shard = request.shard.as_deref().ok_or_else(|| {
            AdminError::BadRequest("shard is required when no count is given".into())
        })?;
        let replica = request.replica.as_deref().ok_or_else(|| {
            AdminError::BadRequest("replica is required when no count is given".into())
        })?;
        view.shard(&collection, shard)?;

        let group = format!("{}/{}/{}", self.tracking_base(request), shard, replica);
        if request.parallel {
            let this = self.clone();
            let task_view = Arc::clone(&view);
            let task_sink = Arc::clone(&sink);
            let task_request = request.clone();
            let collection = collection.clone();
            let shard = shard.to_string();
            let replica = replica.to_string();
            let handle = tokio::spawn(async move {
                // Failure lands in the report, not the caller
                let _ = this
                    .delete_core(
                        task_view,
                        collection,
                        shard,
                        replica,
                        task_request,
                        task_sink,
                        group,
                        on_complete,
                        true,
                    )
                    .await;
            });
            if let Err(e) = handle.await {
                error!("replica deletion task failed: {}", e);
            }
        } else {
            self.delete_core(
                Arc::clone(&view),
                collection,
                shard.to_string(),
                replica.to_string(),
                request.clone(),
                Arc::clone(&sink),
                group,
                on_complete,
                true,
            )
            .await?;
        }

        Ok(sink.snapshot())
    }

    /// Delete replicas based on count, across one shard or all shards of
    /// the collection
    async fn delete_by_count(
        &self,
        view: &Arc<ClusterStateView>,
        collection: &str,
        request: &DeleteReplicaRequest,
        sink: &Arc<ReportSink>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<()> {
        let count = request.count.unwrap_or(0);
        let coll = view.collection(collection)?;

        let targets = match request.shard.as_deref() {
            Some(shard_id) => vec![view.shard(collection, shard_id)?],
            None => coll.shards.values().collect(),
        };

        // Pick per shard first; any shard failing validation rejects the
        // whole request before anything is dispatched
        let mut selections: Vec<(String, BTreeSet<String>)> = Vec::new();
        for shard in &targets {
            let picked = selector::select_for_count(collection, shard, count)?;
            selections.push((shard.name.clone(), picked));
        }

        // Placement is checked per shard over the entire candidate set;
        // no dispatch happens until every shard's batch has passed
        for (shard_id, picked) in &selections {
            self.verifier
                .verify_deletion(view, collection, shard_id, picked)?;
        }

        let base = self.tracking_base(request);
        if request.parallel {
            let mut tasks = JoinSet::new();
            for (shard_id, picked) in &selections {
                for replica in picked {
                    debug!(
                        "deleting replica {} of shard {} based on count {}",
                        replica, shard_id, count
                    );
                    let this = self.clone();
                    let task_view = Arc::clone(view);
                    let task_sink = Arc::clone(sink);
                    let task_request = request.clone();
                    let collection = collection.to_string();
                    let shard_id = shard_id.clone();
                    let replica = replica.clone();
                    let group = format!("{}/{}/{}", base, shard_id, replica);
                    let callback = on_complete.clone();
                    tasks.spawn(async move {
                        // Placement was already verified for the batch
                        let _ = this
                            .delete_core(
                                task_view,
                                collection,
                                shard_id,
                                replica,
                                task_request,
                                task_sink,
                                group,
                                callback,
                                false,
                            )
                            .await;
                    });
                }
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("replica deletion task failed: {}", e);
                }
            }
        } else {
            for (shard_id, picked) in &selections {
                for replica in picked {
                    debug!(
                        "deleting replica {} of shard {} based on count {}",
                        replica, shard_id, count
                    );
                    let group = format!("{}/{}/{}", base, shard_id, replica);
                    // Individual failures land in the ledger; siblings
                    // still run
                    let _ = self
                        .delete_core(
                            Arc::clone(view),
                            collection.to_string(),
                            shard_id.clone(),
                            replica.clone(),
                            request.clone(),
                            Arc::clone(sink),
                            group,
                            on_complete.clone(),
                            false,
                        )
                        .await;
                }
            }
        }

        for (shard_id, picked) in &selections {
            sink.record_shard(shard_id, picked);
        }
        Ok(())
    }

    /// Drive one replica to a terminal state
    #[allow(clippy::too_many_arguments)]
    async fn delete_core(
        &self,
        view: Arc<ClusterStateView>,
        collection: String,
        shard_id: String,
        replica_name: String,
        request: DeleteReplicaRequest,
        sink: Arc<ReportSink>,
        group: String,
        on_complete: Option<CompletionCallback>,
        verify_placement: bool,
    ) -> Result<()> {
        let _guard = CompletionGuard::new(on_complete);

        let result = self
            .delete_core_inner(
                &view,
                &collection,
                &shard_id,
                &replica_name,
                &request,
                &sink,
                &group,
                verify_placement,
            )
            .await;

        match &result {
            Ok(()) => {
                info!(
                    "removed replica {}/{}/{}",
                    collection, shard_id, replica_name
                );
                record_replica_deletion(&collection, "success");
            }
            Err(e) => {
                let node = view
                    .replica(&collection, &shard_id, &replica_name)
                    .ok()
                    .map(|r| r.node.clone());
                sink.record_failure(
                    &replica_name,
                    node.as_deref(),
                    format!("Could not complete delete: {}", e),
                );
                record_replica_deletion(&collection, e.error_type());
            }
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn delete_core_inner(
        &self,
        view: &ClusterStateView,
        collection: &str,
        shard_id: &str,
        replica_name: &str,
        request: &DeleteReplicaRequest,
        sink: &ReportSink,
        group: &str,
        verify_placement: bool,
    ) -> Result<()> {
        let shard = view.shard(collection, shard_id)?;
        let replica = view.replica(collection, shard_id, replica_name)?;

        // The sole remaining replica of a shard is never deletable
        if shard.replica_count() == 1 {
            return Err(AdminError::BadRequest(format!(
                "There is only one replica available in shard/collection: {}/{}. Cannot delete that.",
                shard_id, collection
            )));
        }

        if request.only_if_down && replica.state != ReplicaState::Down {
            return Err(AdminError::BadRequest(format!(
                "Attempted to remove replica: {}/{}/{} with only_if_down=true, but state is '{}'",
                collection,
                shard_id,
                replica_name,
                replica.state.as_str()
            )));
        }

        if verify_placement {
            let proposed: BTreeSet<String> = [replica_name.to_string()].into();
            self.verifier
                .verify_deletion(view, collection, shard_id, &proposed)?;
        }

        // A dead host cannot unload the core; go straight to repair
        let is_live = view.is_node_live(&replica.node);
        if is_live {
            let unload = UnloadCoreRequest::from_request(&replica.core, request);
            self.dispatcher
                .dispatch(group, &replica.node, replica_name, unload);
        } else {
            info!(
                "node {} hosting replica {}/{}/{} is not live; skipping unload dispatch",
                replica.node, collection, shard_id, replica_name
            );
        }

        if is_live {
            for outcome in self.dispatcher.collect(group).await {
                if let Err(e) = outcome.result {
                    // The unload may still have landed, and repair covers
                    // the rest; record and keep going
                    warn!(
                        "unload of replica {} on node {} failed: {}",
                        outcome.replica, outcome.node, e
                    );
                    sink.record_failure(
                        &outcome.replica,
                        Some(&outcome.node),
                        format!("unload request failed: {}", e),
                    );
                }
            }

            if self
                .waiter
                .await_absence(
                    collection,
                    shard_id,
                    replica_name,
                    self.config.convergence_timeout(),
                )
                .await?
            {
                return Ok(());
            }
        }

        // Node-driven removal did not converge; force the entry out of
        // the store and re-observe
        warn!(
            "forcing removal of replica {}/{}/{} from the metadata store",
            collection, shard_id, replica_name
        );
        record_forced_repair(collection);
        self.store
            .remove_replica(collection, shard_id, replica_name)
            .await
            .map_err(|e| {
                AdminError::ServerError(format!(
                    "failed to repair metadata for replica {}/{}/{}: {}",
                    collection, shard_id, replica_name, e
                ))
            })?;
        sink.record_forced(format!("{}/{}/{}", collection, shard_id, replica_name));

        if self
            .waiter
            .await_absence(
                collection,
                shard_id,
                replica_name,
                self.config.convergence_timeout(),
            )
            .await?
        {
            return Ok(());
        }

        Err(AdminError::ServerError(format!(
            "Could not remove replica: {}/{}/{}",
            collection, shard_id, replica_name
        )))
    }

    fn tracking_base(&self, request: &DeleteReplicaRequest) -> String {
        request
            .async_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}
