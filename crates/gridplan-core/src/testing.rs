//! In-memory fakes for the node capabilities.
//!
//! Enabled with the `testing` feature. Every fake node writes what it was
//! asked to do into a shared [`Journal`], so tests can assert on ordering
//! across nodes.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use crate::node::ComputeNode;
use crate::remote::{CommandRunner, NodeConnector, NodeInstaller, PortProbe, RemoteError, RemoteNode};
use crate::sandbox::Sandbox;

/// Ordered record of remote calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }
}

/// A scripted node.
#[derive(Debug, Clone)]
pub struct FakeNode {
    name: String,
    journal: Journal,
    windows: bool,
    home: String,
    busy: HashSet<u16>,
    install_error: Option<RemoteError>,
    delete_error: Option<RemoteError>,
    command_error: Option<RemoteError>,
}

impl FakeNode {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            windows: false,
            home: format!("/opt/{name}/server"),
            busy: HashSet::new(),
            install_error: None,
            delete_error: None,
            command_error: None,
        }
    }

    pub fn windows(mut self) -> Self {
        self.windows = true;
        self
    }

    pub fn home(mut self, home: &str) -> Self {
        self.home = home.to_string();
        self
    }

    pub fn busy_ports(mut self, ports: &[u16]) -> Self {
        self.busy.extend(ports);
        self
    }

    pub fn failing_install(mut self, err: RemoteError) -> Self {
        self.install_error = Some(err);
        self
    }

    pub fn failing_delete(mut self, err: RemoteError) -> Self {
        self.delete_error = Some(err);
        self
    }

    pub fn failing_command(mut self, err: RemoteError) -> Self {
        self.command_error = Some(err);
        self
    }

    fn outcome(&self, err: &Option<RemoteError>) -> Result<(), RemoteError> {
        match err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl NodeInstaller for FakeNode {
    fn install_from_bundle(&self, bundle_url: &str) -> Result<(), RemoteError> {
        self.journal.record(format!("install {} {bundle_url}", self.name));
        self.outcome(&self.install_error)
    }

    fn delete_install(&self) -> Result<(), RemoteError> {
        self.journal.record(format!("delete {}", self.name));
        self.outcome(&self.delete_error)
    }

    fn is_windows(&self) -> bool {
        self.windows
    }

    fn install_home(&self) -> String {
        self.home.clone()
    }
}

impl PortProbe for FakeNode {
    fn is_port_free(&self, port: u16) -> bool {
        !self.busy.contains(&port)
    }
}

impl CommandRunner for FakeNode {
    fn run_shell(&self, command: &str) -> Result<(), RemoteError> {
        self.journal.record(format!("shell {} {command}", self.name));
        self.outcome(&self.command_error)
    }

    fn run_batch(&self, command: &str) -> Result<(), RemoteError> {
        self.journal.record(format!("batch {} {command}", self.name));
        self.outcome(&self.command_error)
    }
}

/// Hands out registered fakes; unknown nodes get a default fake.
#[derive(Debug, Default)]
pub struct FakeConnector {
    journal: Journal,
    nodes: HashMap<String, Arc<FakeNode>>,
}

impl FakeConnector {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            nodes: HashMap::new(),
        }
    }

    pub fn with_node(mut self, node: FakeNode) -> Self {
        self.nodes.insert(node.name.clone(), Arc::new(node));
        self
    }
}

impl NodeConnector for FakeConnector {
    fn connect(&self, node: &ComputeNode) -> Arc<dyn RemoteNode> {
        match self.nodes.get(&node.name) {
            Some(fake) => fake.clone(),
            None => Arc::new(FakeNode::new(&node.name, &self.journal)),
        }
    }
}

/// Sandbox keeping files in memory; can be told to fail one path.
#[derive(Debug, Default)]
pub struct MemorySandbox {
    files: Mutex<HashMap<String, String>>,
    failing: Option<String>,
}

impl MemorySandbox {
    pub fn failing_on(path: &str) -> Self {
        Self {
            files: Mutex::default(),
            failing: Some(path.to_string()),
        }
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Sandbox for MemorySandbox {
    fn write_file(&self, relative_path: &str, contents: &str) -> io::Result<()> {
        if self.failing.as_deref() == Some(relative_path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only workspace"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(relative_path.to_string(), contents.to_string());
        Ok(())
    }
}
