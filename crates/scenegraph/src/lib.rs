//! Scene-graph capability layer for the corrective shape generator.
//!
//! The corrective pipeline never talks to a host scene directly. Instead it
//! consumes the [`SceneGraph`] trait, which exposes exactly the operations
//! the pipeline needs and nothing more:
//!
//! - node lookup by path and node-kind queries
//! - dependency-graph connection queries and surgery (connect/disconnect)
//! - point-array read/write on deformable surfaces, in local space
//! - surface duplication and node deletion
//! - pull-based black-box evaluation of a deformer's output
//! - membership-set member lists and the current selection
//!
//! Hosts adapt their native scene representation behind this trait.
//! [`MemoryScene`] is a complete in-memory implementation used by the test
//! suite and by hosts that have no scene of their own.

mod graph;
mod memory;
mod types;

pub use graph::SceneGraph;
pub use memory::{DeformFn, MemoryScene};
pub use types::{NodeId, NodeKind, Plug, PlugKind, SceneError};
