//! Count-based replica selection
//!
//! Picks which replicas of a shard satisfy a deletion-by-count request.
//! The leader is never auto-selected: skipping it minimizes disruption to
//! active serving, and the skip is honored even when that leaves the
//! requested count unmet. A shard with no elected leader is a valid state
//! during failover; selection then treats every replica as eligible.

use crate::error::{AdminError, Result};
use crate::types::Shard;
use std::collections::BTreeSet;
use tracing::warn;

/// Select up to `count` replica names for removal from a shard
///
/// Validates first: the shard must have more than one replica, and more
/// replicas than requested, so at least one is always left behind.
pub fn select_for_count(collection: &str, shard: &Shard, count: usize) -> Result<BTreeSet<String>> {
    validate_availability(collection, shard, count)?;

    let leader = match shard.leader.as_deref() {
        Some(name) => Some(name),
        None => {
            warn!(
                "shard {}/{} has no elected leader; selecting among all replicas",
                collection, shard.name
            );
            None
        }
    };

    let mut remaining = count;
    let mut selected = BTreeSet::new();
    for name in shard.replicas.keys() {
        if remaining == 0 {
            break;
        }
        if Some(name.as_str()) == leader {
            continue;
        }
        selected.insert(name.clone());
        remaining -= 1;
    }
    Ok(selected)
}

/// Reject requests that would leave a shard without replicas
fn validate_availability(collection: &str, shard: &Shard, count: usize) -> Result<()> {
    let available = shard.replica_count();
    if available == 0 {
        return Err(AdminError::BadRequest(format!(
            "No replicas found in shard/collection: {}/{}",
            shard.name, collection
        )));
    }
    if available == 1 {
        return Err(AdminError::BadRequest(format!(
            "There is only one replica available in shard/collection: {}/{}. Cannot delete that.",
            shard.name, collection
        )));
    }
    if available <= count {
        return Err(AdminError::BadRequest(format!(
            "There are lesser num replicas requested to be deleted than are available in \
             shard/collection: {}/{}. Requested: {} Available: {}.",
            shard.name, collection, count, available
        )));
    }
    Ok(())
}
