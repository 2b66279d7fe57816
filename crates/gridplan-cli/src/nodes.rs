//! Node adapters backed by local processes.
//!
//! The current node runs commands through `sh -c` (or `cmd /C` on Windows).
//! Every other node is reached with `ssh <host>`, where the host defaults to
//! the node name.

use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use gridplan_core::config::{CommandsConfig, NodeConfig};
use gridplan_core::{
    CommandRunner, ComputeNode, NodeConnector, NodeInstaller, PlanConfig, Platform, PortProbe,
    RemoteError, RemoteNode,
};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Connects inventory nodes using the `[inventory]` and `[commands]` config.
pub struct ShellConnector {
    current: String,
    nodes: Vec<NodeConfig>,
    commands: CommandsConfig,
}

impl ShellConnector {
    pub fn from_config(config: &PlanConfig, current: &str) -> Self {
        Self {
            current: current.to_string(),
            nodes: config
                .inventory
                .as_ref()
                .map(|inv| inv.nodes.clone())
                .unwrap_or_default(),
            commands: config.commands.clone(),
        }
    }

    fn shell_node(&self, node: &ComputeNode) -> ShellNode {
        let cfg = self.nodes.iter().find(|n| n.name == node.name);
        let host = cfg
            .and_then(|c| c.host.clone())
            .or_else(|| (node.name != self.current).then(|| node.name.clone()));
        ShellNode {
            name: node.name.clone(),
            host,
            platform: cfg.map(|c| c.platform).unwrap_or_default(),
            home: cfg
                .and_then(|c| c.install_home.clone())
                .unwrap_or_else(|| self.commands.default_home.clone()),
            commands: self.commands.clone(),
        }
    }
}

impl NodeConnector for ShellConnector {
    fn connect(&self, node: &ComputeNode) -> Arc<dyn RemoteNode> {
        Arc::new(self.shell_node(node))
    }
}

/// One node driven through local or ssh processes.
#[derive(Debug, Clone)]
pub struct ShellNode {
    name: String,
    /// `None` for the node this process runs on.
    host: Option<String>,
    platform: Platform,
    home: String,
    commands: CommandsConfig,
}

impl ShellNode {
    fn argv(&self, batch: bool, command: &str) -> Vec<String> {
        match (&self.host, batch) {
            (None, false) => vec!["sh".into(), "-c".into(), command.into()],
            (None, true) => vec!["cmd".into(), "/C".into(), command.into()],
            (Some(host), false) => ssh(host, command.to_string()),
            (Some(host), true) => ssh(host, format!("cmd /C {command}")),
        }
    }

    fn exec(&self, batch: bool, command: &str) -> Result<(), RemoteError> {
        let argv = self.argv(batch, command);
        debug!(node = %self.name, ?argv, "spawning");

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|e| RemoteError::Failed(format!("failed to spawn {}: {e}", argv[0])))?;

        if output.status.success() {
            return Ok(());
        }
        // No exit code means the process was killed by a signal.
        let Some(code) = output.status.code() else {
            return Err(RemoteError::Interrupted);
        };
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(RemoteError::Failed(format!("exit {code}")))
        } else {
            Err(RemoteError::Failed(format!("exit {code}: {stderr}")))
        }
    }

    fn run_platform(&self, command: &str) -> Result<(), RemoteError> {
        self.exec(self.is_windows(), command)
    }
}

/// Non-interactive ssh: a password prompt fails instead of blocking.
fn ssh(host: &str, command: String) -> Vec<String> {
    vec![
        "ssh".into(),
        "-o".into(),
        "BatchMode=yes".into(),
        host.into(),
        command,
    ]
}

impl NodeInstaller for ShellNode {
    fn install_from_bundle(&self, bundle_url: &str) -> Result<(), RemoteError> {
        let command = self
            .commands
            .install_command(self.platform, bundle_url, &self.home);
        self.run_platform(&command)
    }

    fn delete_install(&self) -> Result<(), RemoteError> {
        let command = self.commands.delete_command(self.platform, &self.home);
        self.run_platform(&command)
    }

    fn is_windows(&self) -> bool {
        self.platform == Platform::Windows
    }

    fn install_home(&self) -> String {
        self.home.clone()
    }
}

impl PortProbe for ShellNode {
    fn is_port_free(&self, port: u16) -> bool {
        match &self.host {
            None => TcpListener::bind(("0.0.0.0", port)).is_ok(),
            Some(host) => {
                // Something answering means taken. Unresolvable hosts count as taken.
                let Ok(mut addrs) = (host.as_str(), port).to_socket_addrs() else {
                    debug!(node = %self.name, host, "cannot resolve host");
                    return false;
                };
                addrs.next().is_some_and(|addr| {
                    TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_err()
                })
            }
        }
    }
}

impl CommandRunner for ShellNode {
    fn run_shell(&self, command: &str) -> Result<(), RemoteError> {
        self.exec(false, command)
    }

    fn run_batch(&self, command: &str) -> Result<(), RemoteError> {
        self.exec(true, command)
    }
}
