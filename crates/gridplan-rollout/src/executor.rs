//! Cluster-management commands on the coordinator node.

use tracing::{error, info};

use gridplan_core::{ClusterError, ClusterNode, ClusterResult, ClusterTopology, RemoteError};

/// How a command is handed to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandForm {
    /// POSIX shell.
    Shell,
    /// Windows batch.
    Batch,
}

/// Runs commands on one node, picking the form from the node's platform.
pub struct RemoteCommandExecutor<'a> {
    node: &'a ClusterNode,
}

impl<'a> RemoteCommandExecutor<'a> {
    pub fn new(node: &'a ClusterNode) -> Self {
        Self { node }
    }

    /// Executor bound to the topology's coordinator.
    pub fn for_coordinator(topology: &'a ClusterTopology) -> Self {
        Self::new(topology.coordinator())
    }

    pub fn form(&self) -> CommandForm {
        if self.node.remote().is_windows() {
            CommandForm::Batch
        } else {
            CommandForm::Shell
        }
    }

    /// Run `command` and block until it finishes. No retry.
    pub fn run(&self, command: &str) -> ClusterResult<()> {
        let remote = self.node.remote();
        let result = match self.form() {
            CommandForm::Batch => {
                info!(node = %self.node.name(), "executing Windows batch command");
                remote.run_batch(command)
            }
            CommandForm::Shell => {
                info!(node = %self.node.name(), "executing shell command");
                remote.run_shell(command)
            }
        };

        result.map_err(|e| {
            match &e {
                RemoteError::Interrupted => {
                    error!(node = %self.node.name(), command, "command interrupted");
                }
                RemoteError::Failed(reason) => {
                    error!(node = %self.node.name(), command, %reason, "command failed");
                }
            }
            ClusterError::CommandExecution {
                node: self.node.name().to_string(),
                command: command.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gridplan_core::ComputeNode;
    use gridplan_core::testing::{FakeNode, Journal};

    use super::*;

    fn cluster_node(fake: FakeNode) -> ClusterNode {
        ClusterNode::new(ComputeNode::new("master"), Arc::new(fake))
    }

    #[test]
    fn posix_node_gets_shell_form() {
        let journal = Journal::default();
        let node = cluster_node(FakeNode::new("master", &journal));
        let exec = RemoteCommandExecutor::new(&node);
        assert_eq!(exec.form(), CommandForm::Shell);
        exec.run("asadmin list-clusters").unwrap();
        assert_eq!(journal.entries(), ["shell master asadmin list-clusters"]);
    }

    #[test]
    fn windows_node_gets_batch_form() {
        let journal = Journal::default();
        let node = cluster_node(FakeNode::new("master", &journal).windows());
        let exec = RemoteCommandExecutor::new(&node);
        assert_eq!(exec.form(), CommandForm::Batch);
        exec.run("dir").unwrap();
        assert_eq!(journal.entries(), ["batch master dir"]);
    }

    #[test]
    fn failure_and_interruption_both_surface_as_command_errors() {
        let journal = Journal::default();
        for err in [RemoteError::Failed("exit 1".into()), RemoteError::Interrupted] {
            let node = cluster_node(FakeNode::new("master", &journal).failing_command(err));
            let result = RemoteCommandExecutor::new(&node).run("false");
            assert!(matches!(
                result,
                Err(ClusterError::CommandExecution { ref node, .. }) if node == "master"
            ));
        }
    }
}
