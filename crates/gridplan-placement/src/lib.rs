//! gridplan placement: decides where each instance runs and on which ports.
//!
//! This crate turns a cluster request into a [`ClusterTopology`]. It does
//! NOT touch remote nodes beyond port probes; installing software is the
//! job of `gridplan-rollout`.
//!
//! # Components
//!
//! - **`selector`**: Picks the coordinator plus label-matching nodes
//! - **`ports`**: Auto-assigned ports, user overrides, availability search
//! - **`topology`**: Builds the topology and places instances round-robin
//!
//! [`ClusterTopology`]: gridplan_core::ClusterTopology

pub mod ports;
pub mod selector;
pub mod topology;

pub use ports::{OverlayReport, PortChange, PortPlanner};
pub use selector::{candidate_nodes, select_nodes};
pub use topology::{TopologyBuilder, TopologyRequest, assign_round_robin};
