//! In-memory dependency graph implementing [`SceneGraph`].
//!
//! Used by the test suite and by hosts without a native scene. Evaluation is
//! pull-based and uncached: every [`SceneGraph::evaluate_deformer`] call
//! re-resolves the deformer's live input connection, so connection surgery is
//! visible immediately.

use glam::Vec3;
use tracing::trace;

use crate::graph::SceneGraph;
use crate::types::{NodeId, NodeKind, Plug, PlugKind, SceneError};

/// A deformation function: pose-dependent point positions from input points.
pub type DeformFn = Box<dyn Fn(&[Vec3]) -> Vec<Vec3> + Send + Sync>;

enum NodeData {
    Surface { points: Vec<Vec3> },
    Deformer { deform: DeformFn },
    MembershipSet { members: Vec<NodeId> },
    Other,
}

struct Node {
    name: String,
    data: NodeData,
}

/// In-memory scene: node arena, connection list, selection.
///
/// Deleted nodes leave a tombstone slot so `NodeId`s stay stable.
#[derive(Default)]
pub struct MemoryScene {
    nodes: Vec<Option<Node>>,
    connections: Vec<(Plug, Plug)>,
    selection: Vec<NodeId>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a deformable surface with the given local-space points.
    pub fn add_surface(&mut self, name: &str, points: Vec<Vec3>) -> NodeId {
        self.push(name, NodeData::Surface { points })
    }

    /// Add a deformer node wrapping a black-box deformation function.
    pub fn add_deformer<F>(&mut self, name: &str, deform: F) -> NodeId
    where
        F: Fn(&[Vec3]) -> Vec<Vec3> + Send + Sync + 'static,
    {
        self.push(name, NodeData::Deformer { deform: Box::new(deform) })
    }

    /// Add a membership set listing the surfaces a deformer drives.
    pub fn add_membership_set(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.push(name, NodeData::MembershipSet { members })
    }

    /// Add a node the pipeline has no interest in.
    pub fn add_node(&mut self, name: &str) -> NodeId {
        self.push(name, NodeData::Other)
    }

    /// Wire a deformer between two surfaces and associate its membership set:
    /// `input.SurfaceOutput -> deformer.DeformerInput`,
    /// `deformer.DeformerOutput -> output.GeometryInput`,
    /// `deformer.Message -> set.Message`.
    pub fn bind_deformer(
        &mut self,
        deformer: NodeId,
        input: NodeId,
        output: NodeId,
        set: NodeId,
    ) -> Result<(), SceneError> {
        self.connect(
            Plug::new(input, PlugKind::SurfaceOutput),
            Plug::new(deformer, PlugKind::DeformerInput),
        )?;
        self.connect(
            Plug::new(deformer, PlugKind::DeformerOutput),
            Plug::new(output, PlugKind::GeometryInput),
        )?;
        self.connect(
            Plug::new(deformer, PlugKind::Message),
            Plug::new(set, PlugKind::Message),
        )
    }

    /// Create a deformer plus a membership set naming `output`, wired between
    /// `input` and `output`. Returns `(deformer, set)`.
    pub fn bind_skin<F>(
        &mut self,
        name: &str,
        input: NodeId,
        output: NodeId,
        deform: F,
    ) -> Result<(NodeId, NodeId), SceneError>
    where
        F: Fn(&[Vec3]) -> Vec<Vec3> + Send + Sync + 'static,
    {
        let deformer = self.add_deformer(name, deform);
        let set = self.add_membership_set(&format!("{name}Set"), vec![output]);
        self.bind_deformer(deformer, input, output, set)?;
        Ok((deformer, set))
    }

    pub fn set_selection(&mut self, nodes: Vec<NodeId>) {
        self.selection = nodes;
    }

    /// Number of live (non-deleted) nodes.
    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    fn push(&mut self, name: &str, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node { name: name.to_string(), data }));
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(SceneError::NodeNotFound(id))
    }

    /// A surface's effective points under pull evaluation: if its geometry
    /// input is fed by a deformer, the deformer's output, else stored points.
    fn evaluated_surface_points(&self, surface: NodeId) -> Result<Vec<Vec3>, SceneError> {
        if let Some(src) = self.source(Plug::new(surface, PlugKind::GeometryInput)) {
            if src.kind == PlugKind::DeformerOutput {
                return self.evaluate_deformer(src.node);
            }
        }
        match &self.node(surface)?.data {
            NodeData::Surface { points } => Ok(points.clone()),
            _ => Err(SceneError::NotASurface(surface)),
        }
    }
}

impl SceneGraph for MemoryScene {
    fn find_node(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|node| node.name == path)
                .map(|_| NodeId(i as u32))
        })
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).ok().map(|n| match n.data {
            NodeData::Surface { .. } => NodeKind::Surface,
            NodeData::Deformer { .. } => NodeKind::Deformer,
            NodeData::MembershipSet { .. } => NodeKind::MembershipSet,
            NodeData::Other => NodeKind::Other,
        })
    }

    fn source(&self, dst: Plug) -> Option<Plug> {
        self.connections.iter().find(|(_, d)| *d == dst).map(|(s, _)| *s)
    }

    fn destinations(&self, src: Plug) -> Vec<Plug> {
        self.connections
            .iter()
            .filter(|(s, _)| *s == src)
            .map(|(_, d)| *d)
            .collect()
    }

    fn upstream_sources(&self, node: NodeId) -> Vec<Plug> {
        self.connections
            .iter()
            .filter(|(_, d)| d.node == node)
            .map(|(s, _)| *s)
            .collect()
    }

    fn connect(&mut self, src: Plug, dst: Plug) -> Result<(), SceneError> {
        self.node(src.node)?;
        self.node(dst.node)?;
        if self.source(dst).is_some() {
            return Err(SceneError::AlreadyConnected { dst });
        }
        trace!("connect {:?} -> {:?}", src, dst);
        self.connections.push((src, dst));
        Ok(())
    }

    fn disconnect(&mut self, src: Plug, dst: Plug) -> Result<(), SceneError> {
        let index = self
            .connections
            .iter()
            .position(|(s, d)| *s == src && *d == dst)
            .ok_or(SceneError::NotConnected { src, dst })?;
        trace!("disconnect {:?} -> {:?}", src, dst);
        self.connections.remove(index);
        Ok(())
    }

    fn points(&self, surface: NodeId) -> Result<Vec<Vec3>, SceneError> {
        match &self.node(surface)?.data {
            NodeData::Surface { points } => Ok(points.clone()),
            _ => Err(SceneError::NotASurface(surface)),
        }
    }

    fn set_points(&mut self, surface: NodeId, points: Vec<Vec3>) -> Result<(), SceneError> {
        match &mut self.node_mut(surface)?.data {
            NodeData::Surface { points: stored } => {
                *stored = points;
                Ok(())
            }
            _ => Err(SceneError::NotASurface(surface)),
        }
    }

    fn duplicate_surface(&mut self, surface: NodeId) -> Result<NodeId, SceneError> {
        let points = self.points(surface)?;
        let name = format!("{}_{}", self.node(surface)?.name, self.nodes.len());
        Ok(self.add_surface(&name, points))
    }

    fn delete_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.node(node)?;
        self.connections
            .retain(|(s, d)| s.node != node && d.node != node);
        self.selection.retain(|n| *n != node);
        self.nodes[node.0 as usize] = None;
        trace!("deleted node {:?}", node);
        Ok(())
    }

    fn evaluate_deformer(&self, deformer: NodeId) -> Result<Vec<Vec3>, SceneError> {
        let deform = match &self.node(deformer)?.data {
            NodeData::Deformer { deform } => deform,
            _ => return Err(SceneError::NotADeformer(deformer)),
        };
        let src = self
            .source(Plug::new(deformer, PlugKind::DeformerInput))
            .ok_or(SceneError::UnfedDeformer(deformer))?;
        let input = match src.kind {
            PlugKind::DeformerOutput => self.evaluate_deformer(src.node)?,
            _ => self.evaluated_surface_points(src.node)?,
        };
        Ok(deform(&input))
    }

    fn set_members(&self, set: NodeId) -> Vec<NodeId> {
        match self.node(set) {
            Ok(Node { data: NodeData::MembershipSet { members }, .. }) => members.clone(),
            _ => Vec::new(),
        }
    }

    fn selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn find_node_by_name() {
        let mut scene = MemoryScene::new();
        let surface = scene.add_surface("restShape", quad_points());
        assert_eq!(scene.find_node("restShape"), Some(surface));
        assert_eq!(scene.find_node("missing"), None);
    }

    #[test]
    fn connect_rejects_double_feed() {
        let mut scene = MemoryScene::new();
        let a = scene.add_surface("a", quad_points());
        let b = scene.add_surface("b", quad_points());
        let c = scene.add_surface("c", quad_points());
        let dst = Plug::new(c, PlugKind::GeometryInput);

        scene
            .connect(Plug::new(a, PlugKind::SurfaceOutput), dst)
            .unwrap();
        let err = scene
            .connect(Plug::new(b, PlugKind::SurfaceOutput), dst)
            .unwrap_err();
        assert!(matches!(err, SceneError::AlreadyConnected { .. }));
    }

    #[test]
    fn disconnect_requires_existing_edge() {
        let mut scene = MemoryScene::new();
        let a = scene.add_surface("a", quad_points());
        let b = scene.add_surface("b", quad_points());
        let err = scene
            .disconnect(
                Plug::new(a, PlugKind::SurfaceOutput),
                Plug::new(b, PlugKind::GeometryInput),
            )
            .unwrap_err();
        assert!(matches!(err, SceneError::NotConnected { .. }));
    }

    #[test]
    fn duplicate_preserves_points_and_order() {
        let mut scene = MemoryScene::new();
        let surface = scene.add_surface("restShape", quad_points());
        let copy = scene.duplicate_surface(surface).unwrap();
        assert_ne!(surface, copy);
        assert_eq!(scene.points(copy).unwrap(), quad_points());
    }

    #[test]
    fn delete_drops_node_and_connections() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("rest", quad_points());
        let out = scene.add_surface("out", quad_points());
        let (deformer, _) = scene
            .bind_skin("skin", rest, out, |points| points.to_vec())
            .unwrap();

        scene.delete_node(out).unwrap();
        assert!(scene.points(out).is_err());
        assert!(scene
            .destinations(Plug::new(deformer, PlugKind::DeformerOutput))
            .is_empty());
    }

    #[test]
    fn evaluate_identity_deformer() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("rest", quad_points());
        let out = scene.add_surface("out", quad_points());
        let (deformer, _) = scene
            .bind_skin("skin", rest, out, |points| points.to_vec())
            .unwrap();

        assert_eq!(scene.evaluate_deformer(deformer).unwrap(), quad_points());
    }

    #[test]
    fn evaluate_pulls_through_deformer_chain() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("rest", quad_points());
        let mid = scene.add_surface("mid", quad_points());
        let out = scene.add_surface("out", quad_points());
        let (_, _) = scene
            .bind_skin("lift", rest, mid, |points| {
                points.iter().map(|p| *p + Vec3::Z).collect()
            })
            .unwrap();
        let (second, _) = scene
            .bind_skin("lift2", mid, out, |points| {
                points.iter().map(|p| *p + Vec3::Z).collect()
            })
            .unwrap();

        let evaluated = scene.evaluate_deformer(second).unwrap();
        let expected: Vec<Vec3> = quad_points()
            .iter()
            .map(|p| *p + Vec3::new(0.0, 0.0, 2.0))
            .collect();
        assert_eq!(evaluated, expected);
    }

    #[test]
    fn evaluate_unfed_deformer_fails() {
        let mut scene = MemoryScene::new();
        let deformer = scene.add_deformer("skin", |points| points.to_vec());
        let err = scene.evaluate_deformer(deformer).unwrap_err();
        assert!(matches!(err, SceneError::UnfedDeformer(_)));
    }

    #[test]
    fn selection_round_trip() {
        let mut scene = MemoryScene::new();
        let a = scene.add_surface("a", quad_points());
        let b = scene.add_node("group");
        scene.set_selection(vec![a, b]);
        assert_eq!(scene.selection(), vec![a, b]);
    }
}
