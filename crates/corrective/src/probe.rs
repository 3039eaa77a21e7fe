//! The Skin-Probe Engine.
//!
//! Resolves which deformer drives a surface, then measures the deformer's
//! local response at the current pose by substituting perturbed copies of
//! its input and reading the deformed output. The three axis probes run
//! strictly in sequence against the one shared scene graph; each probe is a
//! full transaction (install perturbed input, evaluate, restore) and the
//! scene must be back in its original state before the next axis runs.

use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use scenegraph::{NodeId, NodeKind, Plug, PlugKind, SceneGraph};

use crate::error::CorrectiveError;

/// A resolved deformer binding: the deformer driving `surface`, confirmed
/// through `set`'s member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeformerBinding {
    pub deformer: NodeId,
    pub set: NodeId,
    pub surface: NodeId,
}

/// The deformer's nominal output plus its response to unit offsets.
///
/// All four point sets share the probed surface's point count and ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResponses {
    /// Output points against the untouched original input.
    pub nominal: Vec<Vec3>,
    /// Output points with +X added to every input point.
    pub smear_x: Vec<Vec3>,
    /// Output points with +Y added to every input point.
    pub smear_y: Vec<Vec3>,
    /// Output points with +Z added to every input point.
    pub smear_z: Vec<Vec3>,
}

/// Find the deformer driving `surface`.
///
/// Walks the dependency graph depth-first upstream from the surface's
/// geometry input. A deformer candidate is accepted only when a membership
/// set hanging off its message plug lists the queried surface — an unrelated
/// deformer that merely sits upstream in the graph is skipped.
///
/// `None` is a normal outcome (ask the user for an explicit deformer, or
/// abort cleanly), not an error.
pub fn resolve_deformer_binding<S: SceneGraph>(
    scene: &S,
    surface: NodeId,
) -> Option<DeformerBinding> {
    let start = scene.source(Plug::new(surface, PlugKind::GeometryInput))?;
    let mut stack = vec![start.node];
    let mut visited = HashSet::new();

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if scene.kind(node) == Some(NodeKind::Deformer) {
            if let Some(set) = membership_set_for(scene, node, surface) {
                trace!("resolved deformer {:?} via set {:?}", node, set);
                return Some(DeformerBinding { deformer: node, set, surface });
            }
        }
        for plug in scene.upstream_sources(node) {
            stack.push(plug.node);
        }
    }
    None
}

/// The membership set confirming that `deformer` drives `surface`, if any.
fn membership_set_for<S: SceneGraph>(
    scene: &S,
    deformer: NodeId,
    surface: NodeId,
) -> Option<NodeId> {
    scene
        .destinations(Plug::new(deformer, PlugKind::Message))
        .into_iter()
        .map(|plug| plug.node)
        .find(|set| {
            scene.kind(*set) == Some(NodeKind::MembershipSet)
                && scene.set_members(*set).contains(&surface)
        })
}

/// Measure the deformer's output for unit X/Y/Z input offsets, plus the
/// nominal output as the reference origin.
///
/// Idempotent over the scene: the input connection, the input points, and
/// the node population are exactly as before once this returns, on success
/// and on failure alike.
pub fn probe_unit_responses<S: SceneGraph>(
    scene: &mut S,
    binding: &DeformerBinding,
) -> Result<UnitResponses, CorrectiveError> {
    let input_plug = Plug::new(binding.deformer, PlugKind::DeformerInput);
    let source = scene
        .source(input_plug)
        .ok_or(CorrectiveError::InputNotConnected(binding.deformer))?;
    let input_points = scene.points(source.node)?;
    debug!(
        "probing deformer {:?} ({} input points)",
        binding.deformer,
        input_points.len()
    );

    let nominal = scene.evaluate_deformer(binding.deformer)?;
    let smear_x = probe_axis(scene, binding.deformer, &input_points, Vec3::X)?;
    let smear_y = probe_axis(scene, binding.deformer, &input_points, Vec3::Y)?;
    let smear_z = probe_axis(scene, binding.deformer, &input_points, Vec3::Z)?;

    Ok(UnitResponses { nominal, smear_x, smear_y, smear_z })
}

/// One axis probe: full install/evaluate/restore transaction.
fn probe_axis<S: SceneGraph>(
    scene: &mut S,
    deformer: NodeId,
    input_points: &[Vec3],
    axis: Vec3,
) -> Result<Vec<Vec3>, CorrectiveError> {
    trace!("probe_axis: axis={:?}", axis);
    let perturbed: Vec<Vec3> = input_points.iter().map(|p| *p + axis).collect();
    let guard = PerturbedInput::install(scene, deformer, perturbed)?;
    let smeared = guard.evaluate()?;
    guard.restore()?;
    Ok(smeared)
}

/// Scoped substitution of a deformer's input with perturbed geometry.
///
/// Construction duplicates the current input surface, writes the perturbed
/// points onto the copy, detaches the real input connection, and attaches
/// the copy. The original connection is restored and the copy deleted on
/// every exit path; [`PerturbedInput::restore`] surfaces restoration errors,
/// the `Drop` fallback logs them.
pub struct PerturbedInput<'a, S: SceneGraph> {
    scene: &'a mut S,
    deformer: NodeId,
    original: Plug,
    temp: NodeId,
    restored: bool,
}

impl<'a, S: SceneGraph> PerturbedInput<'a, S> {
    /// Substitute `points` as the deformer's input.
    pub fn install(
        scene: &'a mut S,
        deformer: NodeId,
        points: Vec<Vec3>,
    ) -> Result<Self, CorrectiveError> {
        let input_plug = Plug::new(deformer, PlugKind::DeformerInput);
        let original = scene
            .source(input_plug)
            .ok_or(CorrectiveError::InputNotConnected(deformer))?;
        let temp = scene.duplicate_surface(original.node)?;

        let wired = (|| -> Result<(), CorrectiveError> {
            scene.set_points(temp, points)?;
            scene.disconnect(original, input_plug)?;
            scene.connect(Plug::new(temp, PlugKind::SurfaceOutput), input_plug)?;
            Ok(())
        })();
        if let Err(err) = wired {
            // Leave the scene as found: the original may already be detached.
            if scene.source(input_plug).is_none() {
                let _ = scene.connect(original, input_plug);
            }
            let _ = scene.delete_node(temp);
            return Err(err);
        }

        trace!("installed perturbed input {:?} on {:?}", temp, deformer);
        Ok(Self { scene, deformer, original, temp, restored: false })
    }

    /// Evaluate the deformer against the perturbed input.
    pub fn evaluate(&self) -> Result<Vec<Vec3>, CorrectiveError> {
        Ok(self.scene.evaluate_deformer(self.deformer)?)
    }

    /// Restore the original input connection and delete the temporary
    /// geometry, surfacing any failure to the caller.
    pub fn restore(mut self) -> Result<(), CorrectiveError> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<(), CorrectiveError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let input_plug = Plug::new(self.deformer, PlugKind::DeformerInput);
        self.scene
            .disconnect(Plug::new(self.temp, PlugKind::SurfaceOutput), input_plug)?;
        self.scene.connect(self.original, input_plug)?;
        self.scene.delete_node(self.temp)?;
        trace!("restored original input on {:?}", self.deformer);
        Ok(())
    }
}

impl<S: SceneGraph> Drop for PerturbedInput<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.restore_inner() {
            // Leaking a perturbed input corrupts every later evaluation;
            // nothing more can be done from a drop path than shout.
            error!(
                "failed to restore input of deformer {:?} after probe: {err}",
                self.deformer
            );
        }
    }
}
