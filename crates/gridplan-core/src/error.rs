//! Error kinds shared by every gridplan crate.

use thiserror::Error;

/// Result alias for planning, provisioning, and descriptor operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Everything that can go wrong during a provisioning run.
///
/// Build-time kinds (`InsufficientNodes`, `PreferenceLoad`, `PortRange`,
/// `NoFreePort`) are raised before any remote side effect happens.
/// `InvalidPortEntry` and `DeleteFailure` are recoverable: callers collect
/// them and keep going.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error(
        "not enough nodes available for instance deployment \
         (required: {required}, available: {available}, label: {label})"
    )]
    InsufficientNodes {
        required: usize,
        available: usize,
        label: String,
    },

    #[error("failed to load instance preferences from {origin}")]
    PreferenceLoad {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid port entry: {entry}={value}")]
    InvalidPortEntry { entry: String, value: String },

    #[error("port range of instance {instance} starting at {base} runs past 65535")]
    PortRange { instance: String, base: u32 },

    #[error("no free port range for instance {instance} on node {node}")]
    NoFreePort { instance: String, node: String },

    #[error("installation failed on node {node}: {reason}")]
    InstallFailure { node: String, reason: String },

    #[error("could not delete installation on node {node}: {reason}")]
    DeleteFailure { node: String, reason: String },

    #[error("command failed on node {node}: {command}: {reason}")]
    CommandExecution {
        node: String,
        command: String,
        reason: String,
    },

    #[error("failed to write descriptor {file}")]
    DescriptorWrite {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot {operation} while the run is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: String,
    },
}

impl ClusterError {
    /// Whether the caller may log this error and continue with other work.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClusterError::InvalidPortEntry { .. } | ClusterError::DeleteFailure { .. }
        )
    }
}
