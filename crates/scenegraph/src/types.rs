//! Type definitions for scene-graph nodes, plugs, and connections.

use serde::{Deserialize, Serialize};

/// Type-safe node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// What a node is, as far as the corrective pipeline cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A deformable surface with an ordered sequence of local-space points
    Surface,
    /// A black-box deformation function between an input and an output surface
    Deformer,
    /// A set node whose member list records which surfaces a deformer drives
    MembershipSet,
    /// Anything else living in the graph
    Other,
}

/// Named attachment points for dependency-graph connections.
///
/// Plugs are typed rather than stringly-named so that graph surgery against
/// the wrong attribute is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlugKind {
    /// A surface's deformed-geometry input (fed by a deformer's output)
    GeometryInput,
    /// A surface's outgoing geometry
    SurfaceOutput,
    /// A deformer's geometry input
    DeformerInput,
    /// A deformer's evaluated output
    DeformerOutput,
    /// Deformer-to-set association link
    Message,
}

/// One end of a dependency-graph connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plug {
    pub node: NodeId,
    pub kind: PlugKind,
}

impl Plug {
    pub fn new(node: NodeId, kind: PlugKind) -> Self {
        Self { node, kind }
    }
}

/// Errors that can occur during scene-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {0:?} is not a deformable surface")]
    NotASurface(NodeId),

    #[error("node {0:?} is not a deformer")]
    NotADeformer(NodeId),

    #[error("no connection from {src:?} to {dst:?}")]
    NotConnected { src: Plug, dst: Plug },

    #[error("plug {dst:?} already has an incoming connection")]
    AlreadyConnected { dst: Plug },

    #[error("deformer {0:?} has no incoming geometry connection")]
    UnfedDeformer(NodeId),
}
