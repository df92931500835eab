//! Read-only view over a cluster state snapshot
//!
//! Pure accessor layer: lookups fail with `BadRequest` errors that list
//! what is available, and liveness checks consult the snapshot's
//! live-node set. Freshness is the metadata store's responsibility —
//! callers re-read the store rather than refreshing a view in place.

use crate::error::{AdminError, Result};
use crate::types::{ClusterStateSnapshot, Collection, Replica, Shard};

/// Read accessor over one injected snapshot
#[derive(Debug, Clone)]
pub struct ClusterStateView {
    snapshot: ClusterStateSnapshot,
}

impl ClusterStateView {
    /// Wrap a snapshot read from the metadata store
    pub fn new(snapshot: ClusterStateSnapshot) -> Self {
        Self { snapshot }
    }

    /// Store version the wrapped snapshot was taken at
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }

    /// Look up a collection by name
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.snapshot
            .collections
            .get(name)
            .ok_or_else(|| AdminError::BadRequest(format!("Collection not found: {}", name)))
    }

    /// Look up a shard within a collection
    pub fn shard(&self, collection: &str, shard: &str) -> Result<&Shard> {
        self.collection(collection)?.shard(shard).ok_or_else(|| {
            AdminError::BadRequest(format!(
                "Invalid shard name: {} in collection: {}",
                shard, collection
            ))
        })
    }

    /// Look up a replica, listing available replica names on a miss
    pub fn replica(&self, collection: &str, shard: &str, replica: &str) -> Result<&Replica> {
        let shard_ref = self.shard(collection, shard)?;
        shard_ref.replica(replica).ok_or_else(|| {
            AdminError::BadRequest(format!(
                "Invalid replica: {} in shard/collection: {}/{}, available replicas are {}",
                replica,
                shard,
                collection,
                shard_ref.replica_names().join(",")
            ))
        })
    }

    /// Whether a node is currently in the live-node set
    pub fn is_node_live(&self, node: &str) -> bool {
        self.snapshot.live_nodes.contains(node)
    }
}
