//! Collaborator traits for the metadata store and alias table
//!
//! The store is the single source of truth for topology. Commands read a
//! versioned snapshot, never mutate it in place, and re-observe every
//! mutation by polling. `remove_replica` is the repair write used when
//! node-driven removal does not converge in time.

use crate::error::Result;
use crate::types::ClusterStateSnapshot;
use async_trait::async_trait;

/// Access to the shared, strongly consistent topology store
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read the current topology snapshot
    async fn cluster_state(&self) -> Result<ClusterStateSnapshot>;

    /// Remove a replica's metadata entry directly, bypassing the
    /// node-driven unregistration path
    async fn remove_replica(&self, collection: &str, shard: &str, replica: &str) -> Result<()>;
}

/// Single-lookup alias resolution
#[async_trait]
pub trait AliasResolver: Send + Sync {
    /// Resolve an alias to its target collection name. Names that are
    /// not aliases resolve to themselves.
    async fn resolve(&self, name: &str) -> Result<String>;
}
