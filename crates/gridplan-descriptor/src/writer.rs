//! Descriptor writer.

use tracing::{error, info};

use gridplan_core::config::DescriptorConfig;
use gridplan_core::{ClusterError, ClusterResult, ClusterTopology, Sandbox};

const RULE: &str = "=================================================";

/// Render the canonical descriptor.
///
/// Instances follow map order with indices starting at 1.
pub fn canonical_descriptor(topology: &ClusterTopology) -> String {
    let mut out = String::new();
    out.push_str(&format!("cluster.name={}\n", topology.name()));
    out.push_str(&format!("cluster.numNodes={}\n", topology.node_count()));
    out.push_str(&format!("cluster.numInstances={}\n", topology.instance_count()));
    out.push_str(&format!("das.node={}\n", topology.coordinator().name()));
    out.push_str(&format!("das.port={}\n", topology.coordinator_port()));

    for (i, instance) in topology.instances().enumerate() {
        let idx = i + 1;
        out.push_str(&format!("instance{idx}.name={}\n", instance.name));
        out.push_str(&format!(
            "instance{idx}.node={}\n",
            instance.node.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("instance{idx}.port={}\n", instance.base_port()));
        for (kind, port) in instance.ports.iter() {
            out.push_str(&format!("instance{idx}.port.{}={port}\n", kind.key()));
        }
    }

    out
}

/// Render the legacy descriptor. No trailing newline.
pub fn legacy_descriptor(topology: &ClusterTopology) -> String {
    let mut out = format!(
        "s1as.home={}\ncluster.name={}\n",
        topology.coordinator().remote().install_home(),
        topology.name()
    );

    let entries: Vec<String> = topology
        .instances()
        .map(|i| {
            format!(
                "{}:{}:{}",
                i.name,
                i.node.as_deref().unwrap_or_default(),
                i.base_port()
            )
        })
        .collect();
    if !entries.is_empty() {
        out.push_str("instancelist=");
        out.push_str(&entries.join(","));
    }

    out
}

/// Writes both descriptors into a [`Sandbox`].
pub struct DescriptorWriter<'a, S: Sandbox + ?Sized> {
    sandbox: &'a S,
    canonical_file: String,
    legacy_file: String,
}

impl<'a, S: Sandbox + ?Sized> DescriptorWriter<'a, S> {
    pub fn new(sandbox: &'a S) -> Self {
        Self::with_config(sandbox, &DescriptorConfig::default())
    }

    pub fn with_config(sandbox: &'a S, config: &DescriptorConfig) -> Self {
        Self {
            sandbox,
            canonical_file: config.canonical_file.clone(),
            legacy_file: config.legacy_file.clone(),
        }
    }

    /// Write the canonical descriptor, then the legacy one.
    ///
    /// The legacy file is skipped if the canonical write fails. Either
    /// failure aborts the call.
    pub fn write(&self, topology: &ClusterTopology) -> ClusterResult<()> {
        let canonical = canonical_descriptor(topology);
        self.write_one(&self.canonical_file, &canonical)?;
        info!(path = %self.sandbox.locate(&self.canonical_file), "created");
        info!("{RULE}");
        for line in canonical.lines() {
            info!("{line}");
        }
        info!("{RULE}");

        self.write_one(&self.legacy_file, &legacy_descriptor(topology))
    }

    fn write_one(&self, file: &str, contents: &str) -> ClusterResult<()> {
        self.sandbox.write_file(file, contents).map_err(|source| {
            error!(file, error = %source, "failed to write descriptor");
            ClusterError::DescriptorWrite {
                file: file.to_string(),
                source,
            }
        })
    }
}
