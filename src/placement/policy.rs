//! Concrete placement policies

use super::PlacementVerifier;
use crate::error::{AdminError, Result};
use crate::state::ClusterStateView;
use std::collections::BTreeSet;

/// Keep a minimum number of replicas per shard after removal
///
/// Optionally also requires that at least one surviving replica is hosted
/// on a currently live node, so a batch cannot strand a shard entirely on
/// unreachable hosts.
#[derive(Debug, Clone)]
pub struct MinimumRedundancy {
    /// Replicas the shard must retain after the batch
    pub min_remaining: usize,

    /// Require a survivor on a live node
    pub require_live_survivor: bool,
}

impl PlacementVerifier for MinimumRedundancy {
    fn verify_deletion(
        &self,
        view: &ClusterStateView,
        collection: &str,
        shard: &str,
        replicas: &BTreeSet<String>,
    ) -> Result<()> {
        let shard_ref = view.shard(collection, shard)?;

        let survivors: Vec<_> = shard_ref
            .replicas
            .values()
            .filter(|r| !replicas.contains(&r.name))
            .collect();

        if survivors.len() < self.min_remaining {
            return Err(AdminError::PlacementViolation(format!(
                "removing {} replica(s) from shard {}/{} would leave {}, policy requires at least {}",
                replicas.len(),
                collection,
                shard,
                survivors.len(),
                self.min_remaining
            )));
        }

        if self.require_live_survivor && !survivors.iter().any(|r| view.is_node_live(&r.node)) {
            return Err(AdminError::PlacementViolation(format!(
                "no surviving replica of shard {}/{} would be hosted on a live node",
                collection, shard
            )));
        }

        Ok(())
    }
}

/// No placement constraints
#[derive(Debug, Clone, Copy)]
pub struct Permissive;

impl PlacementVerifier for Permissive {
    fn verify_deletion(
        &self,
        _view: &ClusterStateView,
        _collection: &str,
        _shard: &str,
        _replicas: &BTreeSet<String>,
    ) -> Result<()> {
        Ok(())
    }
}
