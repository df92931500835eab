//! In-memory fakes and fixtures for command tests

use async_trait::async_trait;
use parking_lot::Mutex;
use shoal_cluster::error::Result;
use shoal_cluster::{
    AdminConfig, AdminError, AliasResolver, ClusterStateSnapshot, Collection, CoreAdminApi,
    DeleteExecutor, MetadataStore, Replica, ReplicaState, Shard, UnloadCoreRequest,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Metadata store fake backed by a mutable snapshot
pub struct FakeMetadataStore {
    snapshot: Mutex<ClusterStateSnapshot>,
    aliases: Mutex<HashMap<String, String>>,
    /// Replica names whose repair write should fail
    pub fail_removals_for: Mutex<HashSet<String>>,
    pub removal_calls: AtomicUsize,
}

impl FakeMetadataStore {
    pub fn new(snapshot: ClusterStateSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            aliases: Mutex::new(HashMap::new()),
            fail_removals_for: Mutex::new(HashSet::new()),
            removal_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_alias(&self, alias: &str, target: &str) {
        self.aliases
            .lock()
            .insert(alias.to_string(), target.to_string());
    }

    pub fn set_node_live(&self, node: &str, live: bool) {
        let mut snapshot = self.snapshot.lock();
        if live {
            snapshot.live_nodes.insert(node.to_string());
        } else {
            snapshot.live_nodes.remove(node);
        }
        snapshot.version += 1;
    }

    pub fn replica_names(&self, collection: &str, shard: &str) -> Vec<String> {
        self.snapshot
            .lock()
            .collections
            .get(collection)
            .and_then(|c| c.shard(shard))
            .map(|s| s.replica_names())
            .unwrap_or_default()
    }

    /// Simulates a node unregistering the core it just unloaded
    pub fn remove_by_core(&self, core: &str) {
        let mut snapshot = self.snapshot.lock();
        for collection in snapshot.collections.values_mut() {
            for shard in collection.shards.values_mut() {
                shard.replicas.retain(|_, r| r.core != core);
            }
        }
        snapshot.version += 1;
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn cluster_state(&self) -> Result<ClusterStateSnapshot> {
        Ok(self.snapshot.lock().clone())
    }

    async fn remove_replica(&self, collection: &str, shard: &str, replica: &str) -> Result<()> {
        self.removal_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_removals_for.lock().contains(replica) {
            return Err(AdminError::MetadataStore(format!(
                "write rejected for {}",
                replica
            )));
        }
        let mut snapshot = self.snapshot.lock();
        if let Some(shard_ref) = snapshot
            .collections
            .get_mut(collection)
            .and_then(|c| c.shards.get_mut(shard))
        {
            shard_ref.replicas.remove(replica);
        }
        snapshot.version += 1;
        Ok(())
    }
}

#[async_trait]
impl AliasResolver for FakeMetadataStore {
    async fn resolve(&self, name: &str) -> Result<String> {
        Ok(self
            .aliases
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string()))
    }
}

/// Node-admin fake that records unload calls
pub struct FakeCoreAdmin {
    store: Arc<FakeMetadataStore>,
    pub unloads: Mutex<Vec<(String, UnloadCoreRequest)>>,
    /// When set, an unloaded core's metadata entry disappears as the
    /// real node-driven path would make it
    pub auto_unregister: AtomicBool,
    pub fail: AtomicBool,
}

impl FakeCoreAdmin {
    pub fn new(store: Arc<FakeMetadataStore>) -> Self {
        Self {
            store,
            unloads: Mutex::new(Vec::new()),
            auto_unregister: AtomicBool::new(true),
            fail: AtomicBool::new(false),
        }
    }

    pub fn unload_count(&self) -> usize {
        self.unloads.lock().len()
    }
}

#[async_trait]
impl CoreAdminApi for FakeCoreAdmin {
    async fn unload_core(&self, node: &str, request: UnloadCoreRequest) -> Result<()> {
        self.unloads
            .lock()
            .push((node.to_string(), request.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AdminError::ServerError(format!(
                "node {} failed to unload {}",
                node, request.core
            )));
        }
        if self.auto_unregister.load(Ordering::SeqCst) {
            self.store.remove_by_core(&request.core);
        }
        Ok(())
    }
}

fn make_replica(collection: &str, shard: &str, name: &str, node: &str) -> Replica {
    Replica {
        name: name.to_string(),
        core: format!("{}_{}_{}", collection, shard, name),
        node: node.to_string(),
        state: ReplicaState::Active,
    }
}

/// Two-shard collection "products": shard1 has r1 (leader, node-1), r2
/// (node-2), r3 (node-3); shard2 has r4 (leader, node-1), r5 (node-2),
/// r6 (node-3). All three nodes live.
pub fn make_snapshot() -> ClusterStateSnapshot {
    let mut collection = Collection::new("products");

    let mut shard1 = Shard::new("shard1");
    for (name, node) in [("r1", "node-1"), ("r2", "node-2"), ("r3", "node-3")] {
        shard1
            .replicas
            .insert(name.into(), make_replica("products", "shard1", name, node));
    }
    shard1.leader = Some("r1".into());
    collection.shards.insert("shard1".into(), shard1);

    let mut shard2 = Shard::new("shard2");
    for (name, node) in [("r4", "node-1"), ("r5", "node-2"), ("r6", "node-3")] {
        shard2
            .replicas
            .insert(name.into(), make_replica("products", "shard2", name, node));
    }
    shard2.leader = Some("r4".into());
    collection.shards.insert("shard2".into(), shard2);

    let mut snapshot = ClusterStateSnapshot {
        version: 1,
        ..Default::default()
    };
    snapshot.collections.insert("products".into(), collection);
    for node in ["node-1", "node-2", "node-3"] {
        snapshot.live_nodes.insert(node.into());
    }
    snapshot
}

/// Config with short waits so timeout paths stay fast in tests
pub fn fast_config() -> AdminConfig {
    AdminConfig {
        convergence_timeout_ms: 300,
        poll_interval_ms: 10,
        request_timeout_ms: 1000,
        ..Default::default()
    }
}

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub struct TestCluster {
    pub store: Arc<FakeMetadataStore>,
    pub core_admin: Arc<FakeCoreAdmin>,
    pub executor: DeleteExecutor,
}

pub fn make_cluster() -> TestCluster {
    make_cluster_with(make_snapshot(), fast_config())
}

pub fn make_cluster_with(snapshot: ClusterStateSnapshot, config: AdminConfig) -> TestCluster {
    init_tracing();
    let store = Arc::new(FakeMetadataStore::new(snapshot));
    let core_admin = Arc::new(FakeCoreAdmin::new(Arc::clone(&store)));
    let executor = DeleteExecutor::new(
        Arc::clone(&store) as Arc<dyn MetadataStore>,
        Arc::clone(&store) as Arc<dyn AliasResolver>,
        Arc::clone(&core_admin) as Arc<dyn CoreAdminApi>,
        config,
    );
    TestCluster {
        store,
        core_admin,
        executor,
    }
}
