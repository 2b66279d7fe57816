use std::path::Path;

use anyhow::{Context, bail};
use tracing::{info, warn};

use gridplan_core::DirSandbox;
use gridplan_descriptor::DescriptorWriter;
use gridplan_rollout::InstallOrchestrator;

use crate::Overrides;

/// Plan, install coordinator then workers, then write both descriptors.
///
/// Descriptors are only written once every node installed. Nodes installed
/// before a failure are left in place; run `uninstall` to clean up.
pub fn provision(
    config_path: &Path,
    overrides: &Overrides,
    bundle: Option<&str>,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path, overrides)?;
    let Some(bundle_url) = bundle.or(config.cluster.bundle_url.as_deref()) else {
        bail!("no bundle URL: pass --bundle or set [cluster].bundle_url");
    };

    let topology = super::build_topology(&config)?;
    let mut orchestrator = InstallOrchestrator::new(&topology);
    orchestrator
        .provision(bundle_url)
        .with_context(|| format!("provisioning stopped ({})", orchestrator.phase()))?;

    let sandbox = DirSandbox::new(&overrides.workspace);
    DescriptorWriter::with_config(&sandbox, &config.descriptor)
        .write(&topology)
        .context("failed to write descriptors")?;

    info!(cluster = %topology.name(), nodes = topology.node_count(), "cluster provisioned");
    println!(
        "✓ Provisioned {} on {} node(s)",
        topology.name(),
        topology.node_count()
    );
    Ok(())
}

/// Remove the installation from every node of the planned cluster.
///
/// Node ports are not probed, so an unreachable node only fails its own
/// delete.
pub fn uninstall(config_path: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    let config = super::load_config(config_path, overrides)?;
    let topology = super::placement_topology(&config)?;
    let report = InstallOrchestrator::new(&topology).uninstall_all();

    for node in &report.deleted {
        println!("✓ {node}");
    }
    for failure in &report.failures {
        warn!(error = %failure, "uninstall incomplete");
        println!("✗ {failure}");
    }
    if !report.is_clean() {
        bail!("{} node(s) could not be cleaned", report.failures.len());
    }
    Ok(())
}

/// Run `command` on the coordinator node.
pub fn exec(config_path: &Path, overrides: &Overrides, command: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path, overrides)?;
    let topology = super::placement_topology(&config)?;
    InstallOrchestrator::new(&topology).run_remote_command(command)?;
    Ok(())
}
