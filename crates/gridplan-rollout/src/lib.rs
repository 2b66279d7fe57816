//! gridplan rollout: installs server software across a planned cluster.
//!
//! Installation is sequential and follows node-selection order: the
//! coordinator first, then every worker. The first worker failure stops
//! the sequence and nothing already installed is rolled back. Uninstall
//! is the opposite: it keeps going past failures.
//!
//! # Components
//!
//! - **`executor`**: Runs shell or batch commands on the coordinator
//! - **`orchestrator`**: Install state machine (coordinator, workers, uninstall)

pub mod executor;
pub mod orchestrator;

pub use executor::{CommandForm, RemoteCommandExecutor};
pub use orchestrator::{InstallOrchestrator, InstallPhase, UninstallReport};
