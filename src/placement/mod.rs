//! Placement verification for replica removal
//!
//! A removal batch must be checked against placement policy before any
//! unload is dispatched, once per shard over the entire set proposed for
//! that shard. Verifying replica-by-replica would let a batch pass checks
//! that only hold when evaluated jointly.
//!
//! Policies are pluggable: the executor holds a `PlacementVerifier` trait
//! object built from configuration.

mod policy;

pub use policy::{MinimumRedundancy, Permissive};

use crate::config::{PlacementConfig, PlacementPolicyKind};
use crate::error::Result;
use crate::state::ClusterStateView;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Policy check over a shard's proposed removal set
pub trait PlacementVerifier: Send + Sync {
    /// Confirm that removing `replicas` from `shard` keeps the shard's
    /// placement constraints satisfiable
    fn verify_deletion(
        &self,
        view: &ClusterStateView,
        collection: &str,
        shard: &str,
        replicas: &BTreeSet<String>,
    ) -> Result<()>;
}

/// Build the configured verifier
pub fn verifier_from_config(config: &PlacementConfig) -> Arc<dyn PlacementVerifier> {
    match config.policy {
        PlacementPolicyKind::MinimumRedundancy => Arc::new(MinimumRedundancy {
            min_remaining: config.min_remaining,
            require_live_survivor: config.require_live_survivor,
        }),
        PlacementPolicyKind::None => Arc::new(Permissive),
    }
}
