//! Topology descriptors: the files downstream tooling reads.
//!
//! Two `key=value` files land in the run's working directory:
//!
//! - **canonical** (`cluster.props`): cluster summary plus one line group
//!   per instance with node and ports
//! - **legacy** (`cluster.properties`): install home, cluster name and a
//!   comma-joined instance list, for older consumers
//!
//! Both layouts are a wire contract; keep them byte-stable.

pub mod reader;
pub mod writer;

pub use reader::{DescriptorError, DescriptorSummary, InstanceEntry, parse_canonical};
pub use writer::{DescriptorWriter, canonical_descriptor, legacy_descriptor};
