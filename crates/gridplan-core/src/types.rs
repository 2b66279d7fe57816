//! Cluster topology data model.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::node::ComputeNode;
use crate::remote::RemoteNode;

/// Port increment between consecutive auto-assigned instances.
pub const PORT_STRIDE: u16 = 0x100;

// ── Ports ─────────────────────────────────────────────────────────

/// Named ports every instance listens on, each a fixed offset from its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortKind {
    Http,
    Https,
    Iiop,
    IiopSsl,
    IiopMutualAuth,
    Jmx,
    Jms,
    Admin,
    Debug,
    OsgiShell,
}

impl PortKind {
    /// All kinds in offset order.
    pub const ALL: [PortKind; 10] = [
        PortKind::Http,
        PortKind::Https,
        PortKind::Iiop,
        PortKind::IiopSsl,
        PortKind::IiopMutualAuth,
        PortKind::Jmx,
        PortKind::Jms,
        PortKind::Admin,
        PortKind::Debug,
        PortKind::OsgiShell,
    ];

    /// Largest offset of any kind. Always below [`PORT_STRIDE`].
    pub const MAX_OFFSET: u16 = 9;

    pub fn offset(self) -> u16 {
        match self {
            PortKind::Http => 0,
            PortKind::Https => 1,
            PortKind::Iiop => 2,
            PortKind::IiopSsl => 3,
            PortKind::IiopMutualAuth => 4,
            PortKind::Jmx => 5,
            PortKind::Jms => 6,
            PortKind::Admin => 7,
            PortKind::Debug => 8,
            PortKind::OsgiShell => 9,
        }
    }

    /// Key used for this port in descriptors.
    pub fn key(self) -> &'static str {
        match self {
            PortKind::Http => "http",
            PortKind::Https => "https",
            PortKind::Iiop => "iiop",
            PortKind::IiopSsl => "iiop-ssl",
            PortKind::IiopMutualAuth => "iiop-mutual-auth",
            PortKind::Jmx => "jmx",
            PortKind::Jms => "jms",
            PortKind::Admin => "admin",
            PortKind::Debug => "debug",
            PortKind::OsgiShell => "osgi-shell",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// A base port plus the ports derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct PortSet {
    base: u16,
}

impl PortSet {
    /// Returns `None` if `base` is zero or a derived port would exceed 65535.
    pub fn new(base: u32) -> Option<Self> {
        if base == 0 || base + u32::from(PortKind::MAX_OFFSET) > u32::from(u16::MAX) {
            return None;
        }
        Some(Self { base: base as u16 })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn port(&self, kind: PortKind) -> u16 {
        self.base + kind.offset()
    }

    /// Every (kind, port) pair in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (PortKind, u16)> + '_ {
        PortKind::ALL.into_iter().map(|k| (k, self.port(k)))
    }

    /// Whether the two ranges share any port.
    pub fn overlaps(&self, other: &PortSet) -> bool {
        let (a0, a1) = (self.base, self.base + PortKind::MAX_OFFSET);
        let (b0, b1) = (other.base, other.base + PortKind::MAX_OFFSET);
        a0 <= b1 && b0 <= a1
    }
}

impl TryFrom<u16> for PortSet {
    type Error = String;

    fn try_from(base: u16) -> Result<Self, Self::Error> {
        PortSet::new(u32::from(base)).ok_or_else(|| format!("invalid base port {base}"))
    }
}

impl From<PortSet> for u16 {
    fn from(ports: PortSet) -> u16 {
        ports.base
    }
}

// ── Instances ─────────────────────────────────────────────────────

/// One server process to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub ports: PortSet,
    /// Name of the hosting cluster node. `None` until placement.
    pub node: Option<String>,
}

impl Instance {
    pub fn new(name: &str, ports: PortSet) -> Self {
        Self {
            name: name.to_string(),
            ports,
            node: None,
        }
    }

    pub fn base_port(&self) -> u16 {
        self.ports.base()
    }

    /// One-line summary used in progress logs.
    pub fn describe(&self) -> String {
        format!(
            "{} node={} port={}",
            self.name,
            self.node.as_deref().unwrap_or("-"),
            self.base_port()
        )
    }
}

/// Instances keyed by name, iterated in insertion order.
pub type InstanceMap = IndexMap<String, Instance>;

// ── Nodes ─────────────────────────────────────────────────────────

/// Whether all instances share the coordinator or get one node each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterMode {
    #[default]
    SingleNode,
    MultiNode,
}

impl ClusterMode {
    /// Nodes needed to host `instance_count` instances.
    pub fn required_nodes(self, instance_count: usize) -> usize {
        match self {
            ClusterMode::SingleNode => 1,
            ClusterMode::MultiNode => instance_count.max(1),
        }
    }
}

/// A node selected into the cluster, with its remote capabilities attached.
#[derive(Clone)]
pub struct ClusterNode {
    pub node: ComputeNode,
    remote: Arc<dyn RemoteNode>,
}

impl ClusterNode {
    pub fn new(node: ComputeNode, remote: Arc<dyn RemoteNode>) -> Self {
        Self { node, remote }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn remote(&self) -> &dyn RemoteNode {
        self.remote.as_ref()
    }
}

impl fmt::Debug for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterNode")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

// ── Topology ──────────────────────────────────────────────────────

/// The planned cluster: who runs where, on which ports.
///
/// The coordinator is held apart from the worker nodes; [`nodes`](Self::nodes)
/// yields it first, followed by the workers in selection order.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    name: String,
    mode: ClusterMode,
    coordinator: ClusterNode,
    workers: Vec<ClusterNode>,
    instances: InstanceMap,
    coordinator_port: u16,
}

impl ClusterTopology {
    pub fn new(
        name: &str,
        mode: ClusterMode,
        coordinator: ClusterNode,
        workers: Vec<ClusterNode>,
        instances: InstanceMap,
        coordinator_port: u16,
    ) -> Self {
        Self {
            name: name.to_string(),
            mode,
            coordinator,
            workers,
            instances,
            coordinator_port,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ClusterMode {
        self.mode
    }

    pub fn coordinator(&self) -> &ClusterNode {
        &self.coordinator
    }

    /// Admin port of the coordinator process.
    pub fn coordinator_port(&self) -> u16 {
        self.coordinator_port
    }

    pub fn workers(&self) -> &[ClusterNode] {
        &self.workers
    }

    /// Coordinator first, then workers in selection order.
    pub fn nodes(&self) -> impl Iterator<Item = &ClusterNode> {
        std::iter::once(&self.coordinator).chain(self.workers.iter())
    }

    pub fn node_count(&self) -> usize {
        1 + self.workers.len()
    }

    pub fn node(&self, name: &str) -> Option<&ClusterNode> {
        self.nodes().find(|n| n.name() == name)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.get(name)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Summary line per instance, in map order.
    pub fn describe_instances(&self) -> Vec<String> {
        self.instances().map(Instance::describe).collect()
    }
}
