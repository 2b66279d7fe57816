pub mod config;
pub mod error;
pub mod node;
pub mod properties;
pub mod remote;
pub mod sandbox;
pub mod types;

pub use config::PlanConfig;
pub use error::{ClusterError, ClusterResult};
pub use node::{ComputeNode, NodeInventory, Platform, StaticInventory};
pub use remote::{CommandRunner, NodeConnector, NodeInstaller, PortProbe, RemoteError, RemoteNode};
pub use sandbox::{DirSandbox, Sandbox};
pub use types::*;

#[cfg(feature = "testing")]
pub mod testing;
