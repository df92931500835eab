//! Topology and command types for replica administration
//!
//! The topology types mirror what the metadata store publishes: an
//! immutable, versioned snapshot of collections, shards, replicas and the
//! live-node set. Command types are serializable wrappers around the
//! structured delete-replica message and its result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lifecycle state of a replica as published by its hosting node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ReplicaState {
    /// Replica is registered and serving
    #[default]
    Active,
    /// Replica is registered but its node reported it down
    Down,
    /// Replica is catching up from its leader
    Recovering,
    /// Replica failed recovery and is not serving
    Failed,
}

impl ReplicaState {
    /// Get state as a string for messages and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicaState::Active => "active",
            ReplicaState::Down => "down",
            ReplicaState::Recovering => "recovering",
            ReplicaState::Failed => "failed",
        }
    }
}

/// One physical copy of a shard, hosted on a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replica {
    /// Replica name, unique within its shard
    pub name: String,

    /// Name of the core backing this replica on its node
    pub core: String,

    /// Identifier of the hosting node
    pub node: String,

    /// Current lifecycle state
    pub state: ReplicaState,
}

/// One partition of a collection, served by one or more replicas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    /// Shard name, unique within its collection
    pub name: String,

    /// Replicas keyed by replica name. BTreeMap keeps iteration
    /// deterministic, which count-based selection relies on.
    pub replicas: BTreeMap<String, Replica>,

    /// Name of the elected leader replica, if any. Absent mid-failover.
    pub leader: Option<String>,
}

impl Shard {
    /// Create an empty shard
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replicas: BTreeMap::new(),
            leader: None,
        }
    }

    /// Look up a replica by name
    pub fn replica(&self, name: &str) -> Option<&Replica> {
        self.replicas.get(name)
    }

    /// Names of all replicas in deterministic order
    pub fn replica_names(&self) -> Vec<String> {
        self.replicas.keys().cloned().collect()
    }

    /// The leader replica, if one is elected and still registered
    pub fn leader_replica(&self) -> Option<&Replica> {
        self.leader.as_deref().and_then(|name| self.replicas.get(name))
    }

    /// Total replica count
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }
}

/// A logical, horizontally-partitioned index spanning multiple shards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name
    pub name: String,

    /// Shards keyed by shard name
    pub shards: BTreeMap<String, Shard>,
}

impl Collection {
    /// Create an empty collection
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shards: BTreeMap::new(),
        }
    }

    /// Look up a shard by name
    pub fn shard(&self, name: &str) -> Option<&Shard> {
        self.shards.get(name)
    }
}

/// Immutable, versioned view of cluster topology
///
/// Read by value per operation and never mutated in place; the metadata
/// store is the single source of truth and bumps `version` on every write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStateSnapshot {
    /// Store version this snapshot was taken at
    pub version: u64,

    /// All collections keyed by name
    pub collections: HashMap<String, Collection>,

    /// Identifiers of currently live nodes
    pub live_nodes: HashSet<String>,
}

/// Structured delete-replica command message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReplicaRequest {
    /// Target collection name or alias
    pub collection: String,

    /// Resolve `collection` through the alias table first
    #[serde(default)]
    pub follow_aliases: bool,

    /// Restrict to one shard
    #[serde(default)]
    pub shard: Option<String>,

    /// Target one specific replica
    #[serde(default)]
    pub replica: Option<String>,

    /// Delete this many replicas per targeted shard instead of one
    /// named replica
    #[serde(default)]
    pub count: Option<usize>,

    /// Run per-replica deletions concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Refuse unless the replica's state is `down`
    #[serde(default)]
    pub only_if_down: bool,

    /// Forwarded to the node-level unload call
    #[serde(default = "default_true")]
    pub delete_index: bool,

    /// Forwarded to the node-level unload call
    #[serde(default = "default_true")]
    pub delete_instance_dir: bool,

    /// Forwarded to the node-level unload call
    #[serde(default = "default_true")]
    pub delete_data_dir: bool,

    /// Correlates this operation for response aggregation
    #[serde(default)]
    pub async_id: Option<String>,
}

fn default_true() -> bool {
    true
}

impl DeleteReplicaRequest {
    /// Request deletion of one named replica
    pub fn single(collection: &str, shard: &str, replica: &str) -> Self {
        Self {
            collection: collection.to_string(),
            follow_aliases: false,
            shard: Some(shard.to_string()),
            replica: Some(replica.to_string()),
            count: None,
            parallel: false,
            only_if_down: false,
            delete_index: true,
            delete_instance_dir: true,
            delete_data_dir: true,
            async_id: None,
        }
    }

    /// Request count-based deletion across a collection's shards
    pub fn by_count(collection: &str, count: usize) -> Self {
        Self {
            collection: collection.to_string(),
            follow_aliases: false,
            shard: None,
            replica: None,
            count: Some(count),
            parallel: false,
            only_if_down: false,
            delete_index: true,
            delete_instance_dir: true,
            delete_data_dir: true,
            async_id: None,
        }
    }
}

/// Node-level unload command for a single core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnloadCoreRequest {
    /// Core to unload
    pub core: String,

    /// Remove the core's index files
    pub delete_index: bool,

    /// Remove the core's instance directory
    pub delete_instance_dir: bool,

    /// Remove the core's data directory
    pub delete_data_dir: bool,
}

impl UnloadCoreRequest {
    /// Build the unload call for a replica from the command's flags
    pub fn from_request(core: &str, request: &DeleteReplicaRequest) -> Self {
        Self {
            core: core.to_string(),
            delete_index: request.delete_index,
            delete_instance_dir: request.delete_instance_dir,
            delete_data_dir: request.delete_data_dir,
        }
    }
}

/// Replicas removed from one shard by a count-based command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDeletionResult {
    /// Shard the replicas were removed from
    pub shard_id: String,

    /// Names of replicas the command attempted to remove
    pub replicas_deleted: Vec<String>,
}

/// A per-replica terminal failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Replica the failure applies to
    pub replica: String,

    /// Hosting node, when known
    pub node: Option<String>,

    /// Human-readable reason
    pub message: String,
}

/// Aggregate result of a delete-replica command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Per-shard results for count-based commands
    pub shards: Vec<ShardDeletionResult>,

    /// Terminal per-replica failures
    pub failures: Vec<FailureRecord>,

    /// Qualified `collection/shard/replica` names whose metadata entry
    /// had to be force-removed after convergence timed out
    pub forced_removals: Vec<String>,
}

impl DeletionReport {
    /// Whether every attempted deletion completed cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.forced_removals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_flag_defaults() {
        // delete-* flags default to true when the message omits them
        let json = r#"{"collection": "products"}"#;
        let request: DeleteReplicaRequest = serde_json::from_str(json).unwrap();
        assert!(request.delete_index);
        assert!(request.delete_instance_dir);
        assert!(request.delete_data_dir);
        assert!(!request.parallel);
        assert!(!request.only_if_down);
        assert!(!request.follow_aliases);
        assert!(request.shard.is_none());
        assert!(request.count.is_none());
        assert!(request.async_id.is_none());
    }

    #[test]
    fn test_request_explicit_flags() {
        let json = r#"{
            "collection": "products",
            "shard": "shard1",
            "replica": "r2",
            "delete_index": false,
            "only_if_down": true,
            "async_id": "op-7"
        }"#;
        let request: DeleteReplicaRequest = serde_json::from_str(json).unwrap();
        assert!(!request.delete_index);
        assert!(request.delete_instance_dir);
        assert!(request.only_if_down);
        assert_eq!(request.async_id.as_deref(), Some("op-7"));
    }

    #[test]
    fn test_shard_leader_replica() {
        let mut shard = Shard::new("shard1");
        shard.replicas.insert(
            "r1".into(),
            Replica {
                name: "r1".into(),
                core: "products_shard1_r1".into(),
                node: "node-1".into(),
                state: ReplicaState::Active,
            },
        );
        shard.leader = Some("r1".into());
        assert_eq!(shard.leader_replica().unwrap().node, "node-1");

        // A dangling leader reference resolves to none
        shard.leader = Some("r9".into());
        assert!(shard.leader_replica().is_none());
    }

    #[test]
    fn test_replica_names_deterministic() {
        let mut shard = Shard::new("shard1");
        for name in ["r3", "r1", "r2"] {
            shard.replicas.insert(
                name.into(),
                Replica {
                    name: name.into(),
                    core: format!("core_{}", name),
                    node: "node-1".into(),
                    state: ReplicaState::Active,
                },
            );
        }
        assert_eq!(shard.replica_names(), vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_unload_request_from_flags() {
        let mut request = DeleteReplicaRequest::single("products", "shard1", "r2");
        request.delete_data_dir = false;
        let unload = UnloadCoreRequest::from_request("products_shard1_r2", &request);
        assert_eq!(unload.core, "products_shard1_r2");
        assert!(unload.delete_index);
        assert!(!unload.delete_data_dir);
    }

    #[test]
    fn test_report_is_clean() {
        let mut report = DeletionReport::default();
        assert!(report.is_clean());
        report.forced_removals.push("products/shard1/r2".into());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut snapshot = ClusterStateSnapshot {
            version: 7,
            ..Default::default()
        };
        snapshot.live_nodes.insert("node-1".into());
        let mut collection = Collection::new("products");
        collection.shards.insert("shard1".into(), Shard::new("shard1"));
        snapshot.collections.insert("products".into(), collection);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ClusterStateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, 7);
        assert!(back.collections["products"].shard("shard1").is_some());
        assert!(back.live_nodes.contains("node-1"));
    }
}
