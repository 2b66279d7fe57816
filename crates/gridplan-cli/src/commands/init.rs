use std::path::Path;

use anyhow::{Context, bail};

use gridplan_core::PlanConfig;

/// Write a single-node gridplan.toml scaffold to `path`.
pub fn init(path: &Path, cluster_name: &str, current_node: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = PlanConfig::scaffold(cluster_name, current_node);
    std::fs::write(path, config.to_toml_string()?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ Generated {}", path.display());
    Ok(())
}
