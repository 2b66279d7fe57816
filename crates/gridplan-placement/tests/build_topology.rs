//! End-to-end topology builds against in-memory inventories.

use gridplan_core::config::PreferenceSource;
use gridplan_core::testing::{FakeConnector, FakeNode, Journal};
use gridplan_core::{ClusterError, ClusterMode, ComputeNode, StaticInventory};
use gridplan_placement::{TopologyBuilder, TopologyRequest};

fn request(num_instances: u32, mode: ClusterMode) -> TopologyRequest {
    TopologyRequest {
        cluster_name: "c1".to_string(),
        instance_prefix: "instance".to_string(),
        num_instances,
        mode,
        node_label: "gfcluster".to_string(),
        base_port: 8000,
        coordinator_admin_port: 4848,
        coordinator_http_port: 8080,
        max_probe_attempts: 16,
        preferences: None,
    }
}

fn inventory() -> StaticInventory {
    StaticInventory::new(
        "master",
        vec![
            ComputeNode::new("master"),
            ComputeNode::new("a").with_labels(["GFCluster"]),
            ComputeNode::new("unlabelled"),
            ComputeNode::new("b").with_labels(["gfcluster"]),
        ],
    )
}

#[test]
fn single_node_cluster_lives_on_coordinator() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let topology = TopologyBuilder::new(&inv, &connector)
        .build(&request(2, ClusterMode::SingleNode))
        .unwrap();

    assert_eq!(topology.node_count(), 1);
    assert_eq!(topology.coordinator().name(), "master");
    assert!(topology.workers().is_empty());

    let i1 = topology.instance("instance1").unwrap();
    let i2 = topology.instance("instance2").unwrap();
    assert_eq!((i1.base_port(), i1.node.as_deref()), (8000, Some("master")));
    assert_eq!((i2.base_port(), i2.node.as_deref()), (8256, Some("master")));
}

#[test]
fn multi_node_cluster_puts_one_instance_per_node() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let topology = TopologyBuilder::new(&inv, &connector)
        .build(&request(3, ClusterMode::MultiNode))
        .unwrap();

    let nodes: Vec<_> = topology.nodes().map(|n| n.name()).collect();
    assert_eq!(nodes, ["master", "a", "b"]);
    let placed: Vec<_> = topology
        .instances()
        .map(|i| (i.name.as_str(), i.node.as_deref().unwrap()))
        .collect();
    assert_eq!(
        placed,
        [("instance1", "master"), ("instance2", "a"), ("instance3", "b")]
    );
    // Planning never installs anything.
    assert!(journal.entries().is_empty());
}

#[test]
fn multi_node_fails_before_side_effects_when_nodes_are_short() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let err = TopologyBuilder::new(&inv, &connector)
        .build(&request(4, ClusterMode::MultiNode))
        .unwrap_err();

    assert!(matches!(
        err,
        ClusterError::InsufficientNodes { required: 4, available: 3, .. }
    ));
    assert!(journal.entries().is_empty());
}

#[test]
fn preferences_add_instances_and_raise_node_count() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let mut req = request(2, ClusterMode::MultiNode);
    req.preferences = Some(PreferenceSource::Inline(
        "instance1=9100\ncustom=9300\nbroken=nope\n".to_string(),
    ));

    let topology = TopologyBuilder::new(&inv, &connector).build(&req).unwrap();

    assert_eq!(topology.instance_count(), 3);
    assert_eq!(topology.node_count(), 3);
    assert_eq!(topology.instance("instance1").unwrap().base_port(), 9100);
    assert_eq!(topology.instance("custom").unwrap().node.as_deref(), Some("b"));
    assert!(topology.instance("broken").is_none());
}

#[test]
fn preference_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("instances.properties");
    std::fs::write(&path, "# overrides\ninstance2 = 9500\n").unwrap();

    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let mut req = request(2, ClusterMode::SingleNode);
    req.preferences = Some(PreferenceSource::File(path));

    let topology = TopologyBuilder::new(&inv, &connector).build(&req).unwrap();
    assert_eq!(topology.instance("instance2").unwrap().base_port(), 9500);
}

#[test]
fn unreadable_preferences_abort_the_build() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let mut req = request(2, ClusterMode::SingleNode);
    req.preferences = Some(PreferenceSource::File("/nonexistent/prefs".into()));

    let err = TopologyBuilder::new(&inv, &connector).build(&req).unwrap_err();
    assert!(matches!(err, ClusterError::PreferenceLoad { .. }));
}

#[test]
fn busy_ports_are_resolved_per_node() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal)
        .with_node(FakeNode::new("a", &journal).busy_ports(&[8256, 8263]));
    let inv = inventory();
    let topology = TopologyBuilder::new(&inv, &connector)
        .build(&request(2, ClusterMode::MultiNode))
        .unwrap();

    assert_eq!(topology.instance("instance1").unwrap().base_port(), 8000);
    assert_eq!(topology.instance("instance2").unwrap().base_port(), 8512);
}

#[test]
fn coordinator_ports_are_never_handed_to_instances() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal);
    let inv = inventory();
    let mut req = request(1, ClusterMode::SingleNode);
    req.base_port = 8080;

    let topology = TopologyBuilder::new(&inv, &connector).build(&req).unwrap();
    assert_eq!(topology.instance("instance1").unwrap().base_port(), 8336);
}

#[test]
fn placement_only_build_skips_port_probing() {
    let journal = Journal::default();
    let connector = FakeConnector::new(&journal)
        .with_node(FakeNode::new("a", &journal).busy_ports(&[8256]));
    let inv = inventory();
    let mut req = request(2, ClusterMode::MultiNode);
    req.max_probe_attempts = 1;

    let err = TopologyBuilder::new(&inv, &connector)
        .build(&req)
        .unwrap_err();
    assert!(matches!(err, ClusterError::NoFreePort { ref node, .. } if node == "a"));

    let topology = TopologyBuilder::new(&inv, &connector)
        .build_placement(&req)
        .unwrap();
    let i2 = topology.instance("instance2").unwrap();
    assert_eq!((i2.base_port(), i2.node.as_deref()), (8256, Some("a")));
}
