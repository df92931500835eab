//! Shoal Cluster - Replica lifecycle commands for distributed Shoal deployments
//!
//! This crate implements the command layer that removes search-node
//! replicas from a live, sharded collection while the cluster keeps
//! serving traffic. It reads a versioned snapshot of topology from the
//! metadata store, applies placement policy, fans unload requests out to
//! the hosting nodes, and polls the store until the mutation is
//! observably converged — with a forced-repair fallback when it is not.
//!
//! # Architecture
//!
//! - **State**: read-only, versioned view over one topology snapshot
//! - **Selector**: count-based replica selection that never picks the leader
//! - **Placement**: pluggable batch-granularity policy verification
//! - **Executor**: per-replica state machine from validation to convergence
//! - **Dispatch**: unload RPC fan-out with tracked response groups
//! - **Convergence**: bounded polling of the metadata store
//!
//! The metadata store, alias table and node-admin RPC are consumed
//! through traits; the store is the single source of truth and every
//! mutation is re-observed there rather than assumed.

pub mod config;
pub mod convergence;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod placement;
pub mod selector;
pub mod state;
pub mod types;

mod executor;

pub use config::{AdminConfig, PlacementConfig, PlacementPolicyKind};
pub use convergence::ConvergenceWaiter;
pub use dispatch::{CoreAdminApi, ShardRequestDispatcher, UnloadOutcome};
pub use error::AdminError;
pub use executor::{CompletionCallback, DeleteExecutor};
pub use metadata::{AliasResolver, MetadataStore};
pub use placement::{MinimumRedundancy, Permissive, PlacementVerifier};
pub use state::ClusterStateView;
pub use types::*;
