//! Canonical descriptor reader, for tooling that consumes `cluster.props`.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use gridplan_core::PortSet;
use gridplan_core::properties::parse_properties;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor is missing key `{0}`")]
    MissingKey(String),

    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// One instance group from the canonical descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceEntry {
    /// 1-based position in the descriptor.
    pub index: usize,
    pub name: String,
    pub node: String,
    pub ports: PortSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorSummary {
    pub cluster_name: String,
    pub num_nodes: usize,
    pub num_instances: usize,
    pub coordinator_node: String,
    pub coordinator_port: u16,
    pub instances: Vec<InstanceEntry>,
}

/// Parse a canonical descriptor.
///
/// Derived `.port.<kind>` lines are not checked against the base port;
/// they are always recomputed from it.
pub fn parse_canonical(text: &str) -> Result<DescriptorSummary, DescriptorError> {
    let entries: HashMap<String, String> = parse_properties(text).into_iter().collect();
    let get = |key: &str| {
        entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DescriptorError::MissingKey(key.to_string()))
    };

    let num_instances: usize = parse_num(get("cluster.numInstances")?, "cluster.numInstances")?;
    let mut instances = Vec::with_capacity(num_instances);
    for index in 1..=num_instances {
        let port_key = format!("instance{index}.port");
        let base: u32 = parse_num(get(&port_key)?, &port_key)?;
        let ports = PortSet::new(base).ok_or_else(|| DescriptorError::InvalidValue {
            key: port_key.clone(),
            value: base.to_string(),
        })?;
        instances.push(InstanceEntry {
            index,
            name: get(&format!("instance{index}.name"))?.to_string(),
            node: get(&format!("instance{index}.node"))?.to_string(),
            ports,
        });
    }

    Ok(DescriptorSummary {
        cluster_name: get("cluster.name")?.to_string(),
        num_nodes: parse_num(get("cluster.numNodes")?, "cluster.numNodes")?,
        num_instances,
        coordinator_node: get("das.node")?.to_string(),
        coordinator_port: parse_num(get("das.port")?, "das.port")?,
        instances,
    })
}

fn parse_num<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, DescriptorError> {
    value.trim().parse().map_err(|_| DescriptorError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
