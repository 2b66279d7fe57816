pub mod init;
pub mod plan;
pub mod provision;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use gridplan_core::{ClusterMode, ClusterTopology, NodeInventory, PlanConfig};
use gridplan_placement::{TopologyBuilder, TopologyRequest};

use crate::Overrides;
use crate::nodes::ShellConnector;

/// Load gridplan.toml and apply command-line overrides.
pub fn load_config(path: &Path, overrides: &Overrides) -> anyhow::Result<PlanConfig> {
    let mut config = PlanConfig::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn apply_overrides(config: &mut PlanConfig, overrides: &Overrides) {
    if let Some(n) = overrides.instances {
        config.cluster.num_instances = n;
    }
    if overrides.multi_node {
        config.cluster.mode = ClusterMode::MultiNode;
    }
    if let Some(label) = &overrides.label {
        config.cluster.node_label = label.clone();
    }
}

/// Build the topology for `config`, connecting nodes over the shell adapters.
pub fn build_topology(config: &PlanConfig) -> anyhow::Result<ClusterTopology> {
    plan_with(config, true)
}

/// Like [`build_topology`] but without probing node ports, for commands that
/// act on an already-provisioned cluster.
pub fn placement_topology(config: &PlanConfig) -> anyhow::Result<ClusterTopology> {
    plan_with(config, false)
}

fn plan_with(config: &PlanConfig, resolve_ports: bool) -> anyhow::Result<ClusterTopology> {
    let inventory = config.static_inventory(&local_node_name());
    let current = inventory.current_node();
    debug!(node = %current.name, "planning from current node");

    let connector = ShellConnector::from_config(config, &current.name);
    let request = TopologyRequest::from_config(config);
    let builder = TopologyBuilder::new(&inventory, &connector);
    let topology = if resolve_ports {
        builder.build(&request)
    } else {
        builder.build_placement(&request)
    };
    topology.with_context(|| format!("failed to plan cluster {}", config.cluster.name))
}

fn local_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
