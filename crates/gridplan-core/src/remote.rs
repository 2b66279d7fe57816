//! Capabilities the host supplies for talking to a node.
//!
//! How commands reach a node (local process, ssh, an agent) is up to the
//! implementation. Every call blocks until the remote side answers.

use std::sync::Arc;

use thiserror::Error;

use crate::node::ComputeNode;

/// Failure reported by a remote capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Failed(String),
    #[error("interrupted")]
    Interrupted,
}

/// Installs and removes the server software on one node.
pub trait NodeInstaller {
    fn install_from_bundle(&self, bundle_url: &str) -> Result<(), RemoteError>;

    fn delete_install(&self) -> Result<(), RemoteError>;

    fn is_windows(&self) -> bool;

    /// Directory the server software is (or will be) installed into.
    fn install_home(&self) -> String;
}

/// Checks whether a TCP port can be bound on the node.
pub trait PortProbe {
    fn is_port_free(&self, port: u16) -> bool;
}

/// Runs a command on the node and waits for it.
pub trait CommandRunner {
    fn run_shell(&self, command: &str) -> Result<(), RemoteError>;

    fn run_batch(&self, command: &str) -> Result<(), RemoteError>;
}

/// Everything a provisioning run needs from a node.
pub trait RemoteNode: NodeInstaller + PortProbe + CommandRunner + Send + Sync {}

impl<T> RemoteNode for T where T: NodeInstaller + PortProbe + CommandRunner + Send + Sync {}

/// Attaches remote capabilities to an inventory node.
pub trait NodeConnector {
    fn connect(&self, node: &ComputeNode) -> Arc<dyn RemoteNode>;
}
