//! Port planning: three passes over the instance map.
//!
//! 1. Auto-assignment: `prefix1..prefixN` get base ports `base`,
//!    `base + 0x100`, ... in creation order.
//! 2. Preference overlay: `name=port` lines update or add instances.
//!    A bad port only drops its own entry.
//! 3. Availability: once instances are placed, each range is moved up by
//!    the stride until every port is free on its node and no earlier
//!    instance on that node already claimed it.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use gridplan_core::properties::parse_properties;
use gridplan_core::{
    ClusterError, ClusterNode, ClusterResult, Instance, InstanceMap, PORT_STRIDE, PortSet,
};

/// Result of applying user port preferences.
#[derive(Debug, Default)]
pub struct OverlayReport {
    pub updated: Vec<String>,
    pub added: Vec<String>,
    /// One [`ClusterError::InvalidPortEntry`] per skipped entry.
    pub rejected: Vec<ClusterError>,
}

impl OverlayReport {
    /// True when no entry was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A base port moved by the availability pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortChange {
    pub instance: String,
    pub node: String,
    pub from: u16,
    pub to: u16,
}

/// Computes and reconciles per-instance ports.
#[derive(Debug, Clone)]
pub struct PortPlanner {
    base_port: u16,
    max_probe_attempts: u32,
}

impl PortPlanner {
    pub fn new(base_port: u16) -> Self {
        Self {
            base_port,
            max_probe_attempts: 64,
        }
    }

    pub fn with_max_probe_attempts(mut self, attempts: u32) -> Self {
        self.max_probe_attempts = attempts.max(1);
        self
    }

    /// Create `count` instances named `prefix1..prefixN` at stride-spaced ports.
    pub fn auto_assign(&self, prefix: &str, count: u32) -> ClusterResult<InstanceMap> {
        let mut instances = InstanceMap::new();
        let mut base = u32::from(self.base_port);

        for i in 1..=count {
            let name = format!("{prefix}{i}");
            let ports = PortSet::new(base).ok_or_else(|| ClusterError::PortRange {
                instance: name.clone(),
                base,
            })?;
            debug!(instance = %name, port = base, "auto-assigned");
            instances.insert(name.clone(), Instance::new(&name, ports));
            base += u32::from(PORT_STRIDE);
        }

        Ok(instances)
    }

    /// Apply `name=port` preferences on top of `instances`.
    ///
    /// Existing instances keep their position in the map; new ones are
    /// appended in text order. Malformed ports are reported and skipped.
    pub fn overlay_preferences(&self, instances: &mut InstanceMap, text: &str) -> OverlayReport {
        let mut report = OverlayReport::default();

        for (name, value) in parse_properties(text) {
            let ports = value
                .parse::<u32>()
                .ok()
                .and_then(PortSet::new);
            let Some(ports) = ports else {
                error!(entry = %name, value = %value, "invalid instance port entry");
                report.rejected.push(ClusterError::InvalidPortEntry {
                    entry: name,
                    value,
                });
                continue;
            };

            if instances.contains_key(&name) {
                debug!(instance = %name, port = ports.base(), "updated");
                report.updated.push(name.clone());
            } else {
                debug!(instance = %name, port = ports.base(), "added");
                report.added.push(name.clone());
            }
            instances.insert(name.clone(), Instance::new(&name, ports));
        }

        report
    }

    /// Move each placed instance onto a port range that is free on its node.
    ///
    /// `reserved` lists ports already taken per node name (the coordinator's
    /// own admin and HTTP ports, for instance). The check is best-effort: the
    /// ports are not held, so another process may grab them afterwards.
    pub fn resolve_availability(
        &self,
        instances: &mut InstanceMap,
        nodes: &[ClusterNode],
        reserved: &[(&str, u16)],
    ) -> ClusterResult<Vec<PortChange>> {
        let mut claimed: HashMap<&str, Vec<PortSet>> = HashMap::new();
        let mut changes = Vec::new();

        for instance in instances.values_mut() {
            let Some(node) = instance
                .node
                .as_deref()
                .and_then(|n| nodes.iter().find(|c| c.name() == n))
            else {
                warn!(instance = %instance.name, "instance not placed, skipping port check");
                continue;
            };

            let taken = claimed.entry(node.name()).or_default();
            let blocked: Vec<u16> = reserved
                .iter()
                .filter(|(n, _)| *n == node.name())
                .map(|(_, p)| *p)
                .collect();

            let mut candidate = u32::from(instance.ports.base());
            let mut chosen = None;
            for _ in 0..self.max_probe_attempts {
                let Some(ports) = PortSet::new(candidate) else {
                    break;
                };
                let usable = !taken.iter().any(|t| t.overlaps(&ports))
                    && ports.iter().all(|(_, p)| !blocked.contains(&p))
                    && ports.iter().all(|(_, p)| node.remote().is_port_free(p));
                if usable {
                    chosen = Some(ports);
                    break;
                }
                candidate += u32::from(PORT_STRIDE);
            }

            let Some(ports) = chosen else {
                error!(instance = %instance.name, node = %node.name(), "no free port range");
                return Err(ClusterError::NoFreePort {
                    instance: instance.name.clone(),
                    node: node.name().to_string(),
                });
            };

            if ports != instance.ports {
                info!(
                    instance = %instance.name,
                    node = %node.name(),
                    from = instance.ports.base(),
                    to = ports.base(),
                    "port in use, reassigned"
                );
                changes.push(PortChange {
                    instance: instance.name.clone(),
                    node: node.name().to_string(),
                    from: instance.ports.base(),
                    to: ports.base(),
                });
                instance.ports = ports;
            }
            taken.push(ports);
        }

        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gridplan_core::ComputeNode;
    use gridplan_core::testing::{FakeNode, Journal};

    use super::*;

    fn node(name: &str, busy: &[u16]) -> ClusterNode {
        let fake = FakeNode::new(name, &Journal::default()).busy_ports(busy);
        ClusterNode::new(ComputeNode::new(name), Arc::new(fake))
    }

    fn placed(planner: &PortPlanner, count: u32, node: &str) -> InstanceMap {
        let mut map = planner.auto_assign("instance", count).unwrap();
        for inst in map.values_mut() {
            inst.node = Some(node.to_string());
        }
        map
    }

    #[test]
    fn auto_assign_uses_stride() {
        let planner = PortPlanner::new(8000);
        let map = planner.auto_assign("instance", 3).unwrap();
        let got: Vec<_> = map.values().map(|i| (i.name.as_str(), i.base_port())).collect();
        assert_eq!(got, [("instance1", 8000), ("instance2", 8256), ("instance3", 8512)]);
        assert!(map.values().all(|i| i.node.is_none()));
    }

    #[test]
    fn auto_assign_rejects_overflowing_ranges() {
        let planner = PortPlanner::new(65000);
        let err = planner.auto_assign("instance", 4).unwrap_err();
        assert!(matches!(err, ClusterError::PortRange { ref instance, .. } if instance == "instance4"));
    }

    #[test]
    fn huge_instance_count_stops_at_port_range() {
        let planner = PortPlanner::new(8000);
        let err = planner.auto_assign("i", u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::PortRange { ref instance, base: 65600 } if instance == "i226"
        ));
    }

    #[test]
    fn overlay_updates_and_adds() {
        let planner = PortPlanner::new(8000);
        let mut map = planner.auto_assign("instance", 2).unwrap();
        let report = planner.overlay_preferences(&mut map, "instance2=9100\nextra = 9300\n");

        assert!(report.is_clean());
        assert_eq!(report.updated, ["instance2"]);
        assert_eq!(report.added, ["extra"]);
        assert_eq!(map["instance2"].base_port(), 9100);
        assert_eq!(map["extra"].base_port(), 9300);
        let order: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(order, ["instance1", "instance2", "extra"]);
    }

    #[test]
    fn overlay_skips_malformed_entries_but_applies_the_rest() {
        let planner = PortPlanner::new(8000);
        let mut map = planner.auto_assign("instance", 2).unwrap();
        let before = map["instance1"].clone();
        let report =
            planner.overlay_preferences(&mut map, "instance1=abc\ninstance2=9100\nbogus=70000\n");

        assert!(!report.is_clean());
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(
            &report.rejected[0],
            ClusterError::InvalidPortEntry { entry, value } if entry == "instance1" && value == "abc"
        ));
        assert_eq!(map["instance1"], before);
        assert_eq!(map["instance2"].base_port(), 9100);
        assert!(!map.contains_key("bogus"));
    }

    #[test]
    fn availability_keeps_free_ports() {
        let planner = PortPlanner::new(8000);
        let nodes = [node("master", &[])];
        let mut map = placed(&planner, 2, "master");
        let changes = planner.resolve_availability(&mut map, &nodes, &[]).unwrap();
        assert!(changes.is_empty());
        assert_eq!(map["instance1"].base_port(), 8000);
    }

    #[test]
    fn availability_moves_busy_range_by_stride() {
        let planner = PortPlanner::new(8000);
        // 8005 is the JMX port of instance1.
        let nodes = [node("master", &[8005])];
        let mut map = placed(&planner, 2, "master");
        let changes = planner.resolve_availability(&mut map, &nodes, &[]).unwrap();

        // instance1 moves to 8256; instance2 can no longer use 8256 and moves on.
        assert_eq!(map["instance1"].base_port(), 8256);
        assert_eq!(map["instance2"].base_port(), 8512);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].from, 8000);
        assert_eq!(changes[0].to, 8256);
    }

    #[test]
    fn availability_avoids_reserved_ports() {
        let planner = PortPlanner::new(4840);
        let nodes = [node("master", &[])];
        let mut map = placed(&planner, 1, "master");
        planner
            .resolve_availability(&mut map, &nodes, &[("master", 4848)])
            .unwrap();
        assert_eq!(map["instance1"].base_port(), 4840 + 256);
    }

    #[test]
    fn availability_is_node_relative() {
        let planner = PortPlanner::new(8000);
        let nodes = [node("a", &[8000]), node("b", &[])];
        let mut map = planner.auto_assign("instance", 1).unwrap();
        map.insert(
            "other".to_string(),
            Instance::new("other", PortSet::new(8000).unwrap()),
        );
        map["instance1"].node = Some("a".to_string());
        map["other"].node = Some("b".to_string());

        planner.resolve_availability(&mut map, &nodes, &[]).unwrap();
        assert_eq!(map["instance1"].base_port(), 8256);
        assert_eq!(map["other"].base_port(), 8000);
    }

    #[test]
    fn availability_gives_up_after_max_attempts() {
        let planner = PortPlanner::new(8000).with_max_probe_attempts(2);
        let nodes = [node("master", &[8000, 8256])];
        let mut map = placed(&planner, 1, "master");
        let err = planner.resolve_availability(&mut map, &nodes, &[]).unwrap_err();
        assert!(matches!(err, ClusterError::NoFreePort { .. }));
    }
}
