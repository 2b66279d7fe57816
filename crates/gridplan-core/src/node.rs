//! Compute nodes and the inventory that owns them.
//!
//! Nodes belong to an external inventory. A provisioning run only reads
//! the inventory; it never creates or removes nodes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Operating system family of a node. Decides shell vs. batch command form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Posix,
    Windows,
}

/// A machine that can host server instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeNode {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl ComputeNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeSet::new(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// First label equal to `label` ignoring ASCII case, if any.
    pub fn matching_label(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.eq_ignore_ascii_case(label))
            .map(String::as_str)
    }
}

/// Read-only view of the node inventory.
pub trait NodeInventory {
    /// Every node known to the inventory, in inventory order.
    fn list_nodes(&self) -> Vec<ComputeNode>;

    /// The node the current provisioning run executes on.
    fn current_node(&self) -> ComputeNode;
}

/// Inventory backed by a fixed list, typically loaded from config.
#[derive(Debug, Clone)]
pub struct StaticInventory {
    nodes: Vec<ComputeNode>,
    current: String,
}

impl StaticInventory {
    pub fn new(current: &str, nodes: Vec<ComputeNode>) -> Self {
        Self {
            nodes,
            current: current.to_string(),
        }
    }
}

impl NodeInventory for StaticInventory {
    fn list_nodes(&self) -> Vec<ComputeNode> {
        self.nodes.clone()
    }

    fn current_node(&self) -> ComputeNode {
        self.nodes
            .iter()
            .find(|n| n.name == self.current)
            .cloned()
            .unwrap_or_else(|| ComputeNode::new(&self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_match_ignores_case() {
        let node = ComputeNode::new("n1").with_labels(["linux", "GFCluster"]);
        assert_eq!(node.matching_label("gfcluster"), Some("GFCluster"));
        assert_eq!(node.matching_label("windows"), None);
    }

    #[test]
    fn current_node_falls_back_to_bare_name() {
        let inv = StaticInventory::new("master", vec![ComputeNode::new("n1")]);
        let current = inv.current_node();
        assert_eq!(current.name, "master");
        assert!(current.labels.is_empty());
    }

    #[test]
    fn current_node_keeps_inventory_labels() {
        let inv = StaticInventory::new(
            "master",
            vec![ComputeNode::new("master").with_labels(["build"])],
        );
        assert!(inv.current_node().labels.contains("build"));
    }
}
