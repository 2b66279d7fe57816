//! Node selection: which inventory nodes join the cluster.
//!
//! The node running the provisioning run is always first and becomes the
//! coordinator. Other nodes qualify when one of their labels matches the
//! selection label, ignoring case. Candidates are taken in inventory order;
//! there is no load-based ranking.

use tracing::{debug, error, info};

use gridplan_core::{ClusterError, ClusterResult, ComputeNode, NodeInventory};

/// Every eligible node: the current node first, then label matches.
pub fn candidate_nodes<I>(inventory: &I, label: &str) -> Vec<ComputeNode>
where
    I: NodeInventory + ?Sized,
{
    let current = inventory.current_node();
    debug!(node = %current.name, "current node is marked as coordinator");
    let mut candidates = vec![current.clone()];

    for node in inventory.list_nodes() {
        if node.name == current.name {
            continue;
        }
        match node.matching_label(label) {
            Some(matched) => {
                debug!(node = %node.name, label = matched, "node is available");
                candidates.push(node);
            }
            None => {
                debug!(node = %node.name, label, "node ignored, no label matched");
            }
        }
    }

    candidates
}

/// Select `required` nodes, coordinator at index 0.
///
/// Fails with [`ClusterError::InsufficientNodes`] when fewer than `required`
/// nodes qualify; nothing is returned in that case.
pub fn select_nodes<I>(inventory: &I, required: usize, label: &str) -> ClusterResult<Vec<ComputeNode>>
where
    I: NodeInventory + ?Sized,
{
    let mut candidates = candidate_nodes(inventory, label);

    if candidates.len() < required {
        error!(
            required,
            available = candidates.len(),
            label,
            "not enough nodes available for instance deployment"
        );
        return Err(ClusterError::InsufficientNodes {
            required,
            available: candidates.len(),
            label: label.to_string(),
        });
    }

    candidates.truncate(required.max(1));
    info!(
        nodes = ?candidates.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
        "selected cluster nodes"
    );
    Ok(candidates)
}
