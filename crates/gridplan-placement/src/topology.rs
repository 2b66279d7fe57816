//! Instance topology: builds the cluster map for one provisioning run.
//!
//! Build order:
//! 1. auto-assign instances and ports
//! 2. overlay user preferences (a load failure aborts the build)
//! 3. work out how many nodes the mode needs
//! 4. select nodes (too few aborts the build)
//! 5. place instances round-robin over the selected nodes
//! 6. move ports that are busy on their node
//!
//! Nothing here installs software, so every failure happens before any
//! remote side effect.

use tracing::{error, info, warn};

use gridplan_core::config::PreferenceSource;
use gridplan_core::{
    ClusterMode, ClusterNode, ClusterResult, ClusterTopology, InstanceMap, NodeConnector,
    NodeInventory, PlanConfig,
};

use crate::ports::PortPlanner;
use crate::selector::select_nodes;

/// Shape of the cluster to plan.
#[derive(Debug, Clone)]
pub struct TopologyRequest {
    pub cluster_name: String,
    pub instance_prefix: String,
    pub num_instances: u32,
    pub mode: ClusterMode,
    pub node_label: String,
    pub base_port: u16,
    pub coordinator_admin_port: u16,
    pub coordinator_http_port: u16,
    pub max_probe_attempts: u32,
    pub preferences: Option<PreferenceSource>,
}

impl TopologyRequest {
    pub fn from_config(config: &PlanConfig) -> Self {
        Self {
            cluster_name: config.cluster.name.clone(),
            instance_prefix: config.cluster.instance_prefix.clone(),
            num_instances: config.cluster.num_instances,
            mode: config.cluster.mode,
            node_label: config.cluster.node_label.clone(),
            base_port: config.cluster.base_port,
            coordinator_admin_port: config.cluster.coordinator_admin_port,
            coordinator_http_port: config.cluster.coordinator_http_port,
            max_probe_attempts: config.ports.max_probe_attempts,
            preferences: config.preference_source(),
        }
    }
}

/// Builds a [`ClusterTopology`] from an inventory and a node connector.
pub struct TopologyBuilder<'a, I: ?Sized, C: ?Sized> {
    inventory: &'a I,
    connector: &'a C,
}

impl<'a, I, C> TopologyBuilder<'a, I, C>
where
    I: NodeInventory + ?Sized,
    C: NodeConnector + ?Sized,
{
    pub fn new(inventory: &'a I, connector: &'a C) -> Self {
        Self {
            inventory,
            connector,
        }
    }

    pub fn build(&self, req: &TopologyRequest) -> ClusterResult<ClusterTopology> {
        self.build_with(req, true)
    }

    /// Build without the availability pass (step 6).
    ///
    /// Instances keep their planned ports and no node is probed. Used for
    /// operations on an existing cluster, such as uninstall, where a node
    /// may be down or its ports held by the running server.
    pub fn build_placement(&self, req: &TopologyRequest) -> ClusterResult<ClusterTopology> {
        self.build_with(req, false)
    }

    fn build_with(&self, req: &TopologyRequest, resolve_ports: bool) -> ClusterResult<ClusterTopology> {
        let planner =
            PortPlanner::new(req.base_port).with_max_probe_attempts(req.max_probe_attempts);

        let mut instances = planner.auto_assign(&req.instance_prefix, req.num_instances)?;

        if let Some(source) = &req.preferences {
            let text = source.read().inspect_err(|e| {
                error!(error = %e, "couldn't load instance preferences, build aborted");
            })?;
            let report = planner.overlay_preferences(&mut instances, &text);
            for rejected in &report.rejected {
                warn!(error = %rejected, "skipped instance preference");
            }
        }

        let required = req.mode.required_nodes(instances.len());
        let selected = select_nodes(self.inventory, required, &req.node_label)?;

        let mut nodes: Vec<ClusterNode> = selected
            .into_iter()
            .map(|n| {
                let remote = self.connector.connect(&n);
                ClusterNode::new(n, remote)
            })
            .collect();

        let names: Vec<String> = nodes.iter().map(|n| n.name().to_string()).collect();
        assign_round_robin(&mut instances, &names);

        if resolve_ports {
            let coordinator_name = names[0].as_str();
            let reserved = [
                (coordinator_name, req.coordinator_admin_port),
                (coordinator_name, req.coordinator_http_port),
            ];
            planner.resolve_availability(&mut instances, &nodes, &reserved)?;
        }

        let coordinator = nodes.remove(0);
        let topology = ClusterTopology::new(
            &req.cluster_name,
            req.mode,
            coordinator,
            nodes,
            instances,
            req.coordinator_admin_port,
        );

        info!(
            cluster = %topology.name(),
            nodes = topology.node_count(),
            instances = topology.instance_count(),
            coordinator = %topology.coordinator().name(),
            "cluster map created"
        );
        for line in topology.describe_instances() {
            info!("{line}");
        }

        Ok(topology)
    }
}

/// Place instances on `nodes` round-robin, in map order.
///
/// Slot `i` goes to `nodes[i % nodes.len()]`, so the coordinator at index 0
/// takes the first slot of every rotation. Deterministic: the same map and
/// node list always produce the same assignment.
pub fn assign_round_robin(instances: &mut InstanceMap, nodes: &[String]) {
    if nodes.is_empty() {
        return;
    }
    for (slot, instance) in instances.values_mut().enumerate() {
        instance.node = Some(nodes[slot % nodes.len()].clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridplan_core::{Instance, PortSet};

    fn map(names: &[&str]) -> InstanceMap {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let ports = PortSet::new(8000 + 256 * i as u32).unwrap();
                (n.to_string(), Instance::new(n, ports))
            })
            .collect()
    }

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn round_robin_wraps_over_nodes() {
        let mut instances = map(&["i1", "i2", "i3", "i4", "i5"]);
        assign_round_robin(&mut instances, &nodes(&["master", "a", "b"]));
        let placed: Vec<_> = instances
            .values()
            .map(|i| i.node.as_deref().unwrap())
            .collect();
        assert_eq!(placed, ["master", "a", "b", "master", "a"]);
    }

    #[test]
    fn round_robin_single_node_puts_everything_on_coordinator() {
        let mut instances = map(&["i1", "i2", "i3"]);
        assign_round_robin(&mut instances, &nodes(&["master"]));
        assert!(instances.values().all(|i| i.node.as_deref() == Some("master")));
    }

    #[test]
    fn round_robin_is_idempotent() {
        let node_list = nodes(&["master", "a"]);
        let mut instances = map(&["i1", "i2", "i3"]);
        assign_round_robin(&mut instances, &node_list);
        let first = instances.clone();
        assign_round_robin(&mut instances, &node_list);
        assert_eq!(first, instances);
    }

    #[test]
    fn request_from_config() {
        let config = PlanConfig::scaffold("c1", "master");
        let req = TopologyRequest::from_config(&config);
        assert_eq!(req.cluster_name, "c1");
        assert_eq!(req.num_instances, 2);
        assert_eq!(req.coordinator_admin_port, 4848);
        assert!(req.preferences.is_none());
    }
}
