//! Configuration for replica administration

use serde::{Deserialize, Serialize};

/// Configuration for the delete-replica command layer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// How long to wait for a replica entry to disappear from the
    /// metadata store before forcing removal, in milliseconds.
    /// Applied twice: once for the node-driven path and once after repair.
    #[serde(default = "default_convergence_timeout")]
    pub convergence_timeout_ms: u64,

    /// Interval between metadata store polls while waiting, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for a single unload RPC to a node, in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Placement policy applied before any removal is dispatched
    #[serde(default)]
    pub placement: PlacementConfig,
}

fn default_convergence_timeout() -> u64 {
    30_000
}

fn default_poll_interval() -> u64 {
    100
}

fn default_request_timeout() -> u64 {
    30_000
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            convergence_timeout_ms: default_convergence_timeout(),
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_request_timeout(),
            placement: PlacementConfig::default(),
        }
    }
}

impl AdminConfig {
    /// Get convergence timeout as Duration
    pub fn convergence_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.convergence_timeout_ms)
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

/// Which placement policy to enforce on deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PlacementPolicyKind {
    /// Keep a configured minimum number of replicas per shard
    #[default]
    MinimumRedundancy,
    /// No placement constraints
    None,
}

/// Placement verification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlacementConfig {
    /// Policy selector
    #[serde(default)]
    pub policy: PlacementPolicyKind,

    /// Minimum replicas a shard must retain after a removal batch
    #[serde(default = "default_min_remaining")]
    pub min_remaining: usize,

    /// Require at least one surviving replica to be hosted on a live node
    #[serde(default)]
    pub require_live_survivor: bool,
}

fn default_min_remaining() -> usize {
    1
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            policy: PlacementPolicyKind::default(),
            min_remaining: default_min_remaining(),
            require_live_survivor: false,
        }
    }
}
