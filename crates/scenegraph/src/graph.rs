//! The capability trait the corrective pipeline consumes.

use glam::Vec3;

use crate::types::{NodeId, NodeKind, Plug, SceneError};

/// Host scene-graph capabilities.
///
/// One shared mutable dependency graph sits behind this trait. A probing
/// session takes `&mut` access for its whole duration, so two sessions can
/// never interleave graph surgery against the same deformer; the exclusive
/// borrow is the critical section.
pub trait SceneGraph {
    /// Look up a node by its scene path or name.
    fn find_node(&self, path: &str) -> Option<NodeId>;

    /// What kind of node this is, or `None` if it does not exist.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// The plug feeding `dst`, if any. A plug has at most one source.
    fn source(&self, dst: Plug) -> Option<Plug>;

    /// All plugs fed by `src`.
    fn destinations(&self, src: Plug) -> Vec<Plug>;

    /// Source plugs feeding any input plug of `node`, for upstream traversal.
    fn upstream_sources(&self, node: NodeId) -> Vec<Plug>;

    /// Connect `src` into `dst`. Fails if `dst` is already fed.
    fn connect(&mut self, src: Plug, dst: Plug) -> Result<(), SceneError>;

    /// Remove the exact connection `src -> dst`.
    fn disconnect(&mut self, src: Plug, dst: Plug) -> Result<(), SceneError>;

    /// Read a surface's points in local space. Order is stable.
    fn points(&self, surface: NodeId) -> Result<Vec<Vec3>, SceneError>;

    /// Overwrite a surface's points. Count and order must match the
    /// surface's existing topology; the scene does not re-order.
    fn set_points(&mut self, surface: NodeId, points: Vec<Vec3>) -> Result<(), SceneError>;

    /// Duplicate a surface's geometry, point ordering preserved exactly.
    /// The duplicate carries no connections.
    fn duplicate_surface(&mut self, surface: NodeId) -> Result<NodeId, SceneError>;

    /// Delete a node and every connection touching it.
    fn delete_node(&mut self, node: NodeId) -> Result<(), SceneError>;

    /// Pull-evaluate a deformer's output points against its current input
    /// connection. Must re-read the live input on every call; stale cached
    /// reads between connection surgery and capture would corrupt probing.
    fn evaluate_deformer(&self, deformer: NodeId) -> Result<Vec<Vec3>, SceneError>;

    /// Member list of a membership set. Empty for non-set nodes.
    fn set_members(&self, set: NodeId) -> Vec<NodeId>;

    /// The host's current selection.
    fn selection(&self) -> Vec<NodeId>;
}
