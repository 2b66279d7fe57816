//! Plan a topology, write its descriptors to disk, read them back.

use gridplan_core::testing::{FakeConnector, FakeNode, Journal};
use gridplan_core::{ClusterMode, ComputeNode, DirSandbox, PortKind, StaticInventory};
use gridplan_descriptor::{DescriptorWriter, parse_canonical};
use gridplan_placement::{TopologyBuilder, TopologyRequest};

#[test]
fn multi_node_descriptors_round_trip_through_disk() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal)
        .with_node(FakeNode::new("master", &journal).home("/srv/appserver"));
    let inventory = StaticInventory::new(
        "master",
        ["master", "a", "b"]
            .into_iter()
            .map(|n| ComputeNode::new(n).with_labels(["grid"]))
            .collect(),
    );
    let request = TopologyRequest {
        cluster_name: "orders".to_string(),
        instance_prefix: "instance".to_string(),
        num_instances: 2,
        mode: ClusterMode::MultiNode,
        node_label: "grid".to_string(),
        base_port: 9000,
        coordinator_admin_port: 4848,
        coordinator_http_port: 8080,
        max_probe_attempts: 8,
        preferences: None,
    };
    let topology = TopologyBuilder::new(&inventory, &connector)
        .build(&request)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sandbox = DirSandbox::new(dir.path());
    DescriptorWriter::new(&sandbox).write(&topology).unwrap();

    let canonical = std::fs::read_to_string(dir.path().join("cluster.props")).unwrap();
    let summary = parse_canonical(&canonical).unwrap();
    assert_eq!(summary.cluster_name, "orders");
    assert_eq!(summary.num_nodes, 2);
    assert_eq!(summary.coordinator_node, "master");
    let placed: Vec<_> = summary
        .instances
        .iter()
        .map(|i| (i.name.as_str(), i.node.as_str(), i.ports.port(PortKind::Http)))
        .collect();
    assert_eq!(placed, [("instance1", "master", 9000), ("instance2", "a", 9256)]);

    let legacy = std::fs::read_to_string(dir.path().join("cluster.properties")).unwrap();
    assert_eq!(
        legacy,
        "s1as.home=/srv/appserver\ncluster.name=orders\n\
         instancelist=instance1:master:9000,instance2:a:9256"
    );
}
