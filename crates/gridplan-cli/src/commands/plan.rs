use std::path::Path;

use anyhow::Context;

use gridplan_core::PlanConfig;
use gridplan_core::config::DescriptorConfig;
use gridplan_descriptor::{canonical_descriptor, parse_canonical};

use crate::Overrides;

/// Build the topology and print it. Nothing is installed or written.
pub fn plan(config_path: &Path, overrides: &Overrides, format: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path, overrides)?;
    let topology = super::build_topology(&config)?;
    let canonical = canonical_descriptor(&topology);

    match format {
        "json" => {
            let summary = parse_canonical(&canonical)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => print!("{canonical}"),
    }
    Ok(())
}

/// Print the canonical descriptor left in `workspace` by a provision run.
pub fn show(config_path: &Path, workspace: &Path, format: &str) -> anyhow::Result<()> {
    let descriptor = descriptor_config(config_path)?;
    let path = workspace.join(&descriptor.canonical_file);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let summary =
        parse_canonical(&text).with_context(|| format!("malformed descriptor {}", path.display()))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!(
                "cluster {}: {} instance(s) on {} node(s), coordinator {}:{}",
                summary.cluster_name,
                summary.num_instances,
                summary.num_nodes,
                summary.coordinator_node,
                summary.coordinator_port
            );
            for inst in &summary.instances {
                println!("  {} node={} port={}", inst.name, inst.node, inst.ports.base());
            }
        }
    }
    Ok(())
}

/// Descriptor file names from gridplan.toml, or the defaults without one.
fn descriptor_config(config_path: &Path) -> anyhow::Result<DescriptorConfig> {
    if !config_path.exists() {
        return Ok(DescriptorConfig::default());
    }
    let config = PlanConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    Ok(config.descriptor)
}
