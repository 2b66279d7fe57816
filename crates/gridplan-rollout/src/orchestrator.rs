//! Install orchestrator: drives one provisioning run's install state machine.
//!
//! ```text
//! Planned ──install_coordinator──▶ CoordinatorInstalling ──install_workers──▶ WorkersInstalling ──▶ Complete
//!                                        │                                          │
//!                                        └──────────────▶ Failed ◀──────────────────┘
//! ```
//!
//! A failure leaves already-installed nodes in place. Cleanup is a
//! separate, explicit [`InstallOrchestrator::uninstall_all`] call.

use std::fmt;

use tracing::{debug, error, info, warn};

use gridplan_core::{ClusterError, ClusterNode, ClusterResult, ClusterTopology, RemoteError};

use crate::executor::RemoteCommandExecutor;

/// Where a provisioning run stands.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InstallPhase {
    /// Topology built, nothing installed yet.
    Planned,
    /// Coordinator install started (and, once the call returns Ok, done).
    CoordinatorInstalling,
    /// Installing the remaining nodes one by one.
    WorkersInstalling,
    /// Every node installed.
    Complete,
    /// An install failed; the run is over.
    Failed { node: String, reason: String },
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallPhase::Planned => f.write_str("planned"),
            InstallPhase::CoordinatorInstalling => f.write_str("installing coordinator"),
            InstallPhase::WorkersInstalling => f.write_str("installing workers"),
            InstallPhase::Complete => f.write_str("complete"),
            InstallPhase::Failed { node, .. } => write!(f, "failed on {node}"),
        }
    }
}

/// Outcome of a best-effort uninstall.
#[derive(Debug, Default)]
pub struct UninstallReport {
    pub deleted: Vec<String>,
    /// One [`ClusterError::DeleteFailure`] per node that could not be cleaned.
    pub failures: Vec<ClusterError>,
}

impl UninstallReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequences install and delete operations over a [`ClusterTopology`].
pub struct InstallOrchestrator<'a> {
    topology: &'a ClusterTopology,
    phase: InstallPhase,
    installed: Vec<String>,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(topology: &'a ClusterTopology) -> Self {
        Self {
            topology,
            phase: InstallPhase::Planned,
            installed: Vec::new(),
        }
    }

    pub fn phase(&self) -> &InstallPhase {
        &self.phase
    }

    /// Nodes installed during this run, in install order.
    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    /// Install on the coordinator node only.
    pub fn install_coordinator(&mut self, bundle_url: &str) -> ClusterResult<()> {
        self.expect_phase(&InstallPhase::Planned, "install the coordinator")?;
        self.phase = InstallPhase::CoordinatorInstalling;
        let topology = self.topology;
        info!(
            cluster = %topology.name(),
            node = %topology.coordinator().name(),
            "installing coordinator"
        );
        self.install_on(topology.coordinator(), bundle_url)
    }

    /// Install on every other node in selection order, stopping at the first
    /// failure. Nodes after the failing one are not attempted.
    pub fn install_workers(&mut self, bundle_url: &str) -> ClusterResult<()> {
        self.expect_phase(&InstallPhase::CoordinatorInstalling, "install workers")?;
        self.phase = InstallPhase::WorkersInstalling;

        let topology = self.topology;
        let coordinator = topology.coordinator().name();
        for node in topology.workers() {
            if node.name() == coordinator {
                continue;
            }
            self.install_on(node, bundle_url)?;
        }

        self.phase = InstallPhase::Complete;
        info!(
            cluster = %topology.name(),
            nodes = self.installed.len(),
            "installation complete"
        );
        Ok(())
    }

    /// Coordinator, then workers.
    pub fn provision(&mut self, bundle_url: &str) -> ClusterResult<()> {
        self.install_coordinator(bundle_url)?;
        self.install_workers(bundle_url)
    }

    /// Delete the installation from every node, continuing past failures.
    pub fn uninstall_all(&self) -> UninstallReport {
        let mut report = UninstallReport::default();

        for node in self.topology.nodes() {
            info!(node = %node.name(), "deleting installation");
            match node.remote().delete_install() {
                Ok(()) => report.deleted.push(node.name().to_string()),
                Err(e) => {
                    warn!(node = %node.name(), error = %e, "couldn't delete installation");
                    report.failures.push(ClusterError::DeleteFailure {
                        node: node.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Run a cluster-management command on the coordinator.
    pub fn run_remote_command(&self, command: &str) -> ClusterResult<()> {
        RemoteCommandExecutor::for_coordinator(self.topology).run(command)
    }

    fn install_on(&mut self, node: &ClusterNode, bundle_url: &str) -> ClusterResult<()> {
        info!(node = %node.name(), bundle = bundle_url, "installing bundle");
        match node.remote().install_from_bundle(bundle_url) {
            Ok(()) => {
                debug!(node = %node.name(), "installed");
                self.installed.push(node.name().to_string());
                Ok(())
            }
            Err(e) => {
                let reason = match &e {
                    RemoteError::Interrupted => "interrupted".to_string(),
                    RemoteError::Failed(r) => r.clone(),
                };
                error!(node = %node.name(), %reason, "installation failed");
                self.phase = InstallPhase::Failed {
                    node: node.name().to_string(),
                    reason: reason.clone(),
                };
                Err(ClusterError::InstallFailure {
                    node: node.name().to_string(),
                    reason,
                })
            }
        }
    }

    fn expect_phase(&self, expected: &InstallPhase, operation: &'static str) -> ClusterResult<()> {
        if &self.phase == expected {
            Ok(())
        } else {
            Err(ClusterError::InvalidPhase {
                operation,
                phase: self.phase.to_string(),
            })
        }
    }
}
