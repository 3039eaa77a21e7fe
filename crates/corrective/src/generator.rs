//! Host-facing entry points.
//!
//! `create_corrective_deltas` probes the skin binding of the generator shape
//! and factors the pose out of the sculpt; `create_corrective_shape`
//! rebuilds a corrective target from stored deltas. Input validation helpers
//! map user-supplied paths and the current selection onto surface nodes
//! before any graph surgery happens.

use glam::Vec3;
use tracing::debug;

use scenegraph::{NodeId, NodeKind, SceneError, SceneGraph};

use crate::error::CorrectiveError;
use crate::frames::{apply_deltas, compute_deltas};
use crate::probe::{probe_unit_responses, resolve_deformer_binding};

/// Derive rest-space corrective deltas from a sculpted pose fix.
///
/// `generator_shape` is the surface carrying the skin binding;
/// `sculpt_shape` is the sculpted correction with identical topology and
/// point ordering. Fails with [`CorrectiveError::BindingNotFound`] when no
/// deformer drives the generator shape.
pub fn create_corrective_deltas<S: SceneGraph>(
    scene: &mut S,
    generator_shape: NodeId,
    sculpt_shape: NodeId,
) -> Result<Vec<Vec3>, CorrectiveError> {
    ensure_surface(scene, generator_shape)?;
    ensure_surface(scene, sculpt_shape)?;

    let binding = resolve_deformer_binding(scene, generator_shape)
        .ok_or(CorrectiveError::BindingNotFound)?;
    debug!(
        "generating corrective deltas: deformer {:?}, sculpt {:?}",
        binding.deformer, sculpt_shape
    );

    // Reject mismatched topology before any probing touches the graph.
    let sculpt_points = scene.points(sculpt_shape)?;
    let generator_count = scene.points(generator_shape)?.len();
    if sculpt_points.len() != generator_count {
        return Err(CorrectiveError::PointCountMismatch {
            expected: generator_count,
            actual: sculpt_points.len(),
        });
    }

    let responses = probe_unit_responses(scene, &binding)?;
    compute_deltas(&responses, &sculpt_points)
}

/// Build a corrective shape: a duplicate of `rest_shape` with the deltas
/// added onto its points. `rest_shape` itself is never mutated, and nothing
/// is created when the counts do not match.
pub fn create_corrective_shape<S: SceneGraph>(
    scene: &mut S,
    rest_shape: NodeId,
    deltas: &[Vec3],
) -> Result<NodeId, CorrectiveError> {
    ensure_surface(scene, rest_shape)?;
    let rest_points = scene.points(rest_shape)?;
    let corrective_points = apply_deltas(&rest_points, deltas)?;

    let corrective = scene.duplicate_surface(rest_shape)?;
    scene.set_points(corrective, corrective_points)?;
    debug!("built corrective shape {:?} from {:?}", corrective, rest_shape);
    Ok(corrective)
}

/// Map a user-supplied object path to an existing surface node.
pub fn resolve_surface<S: SceneGraph>(scene: &S, path: &str) -> Result<NodeId, CorrectiveError> {
    let node = scene
        .find_node(path)
        .ok_or_else(|| CorrectiveError::ObjectNotFound(path.to_string()))?;
    ensure_surface(scene, node)?;
    Ok(node)
}

/// The surfaces in the host's current selection, in selection order.
pub fn selected_surfaces<S: SceneGraph>(scene: &S) -> Vec<NodeId> {
    scene
        .selection()
        .into_iter()
        .filter(|node| scene.kind(*node) == Some(NodeKind::Surface))
        .collect()
}

fn ensure_surface<S: SceneGraph>(scene: &S, node: NodeId) -> Result<(), CorrectiveError> {
    match scene.kind(node) {
        Some(NodeKind::Surface) => Ok(()),
        Some(_) => Err(CorrectiveError::NotASurface(node)),
        None => Err(CorrectiveError::Scene(SceneError::NodeNotFound(node))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use scenegraph::MemoryScene;

    const EPS: f32 = 1e-5;

    fn quad_points() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    fn assert_points_near(actual: &[Vec3], expected: &[Vec3]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((*a - *e).length() < EPS, "{a:?} != {e:?}");
        }
    }

    #[test]
    fn flat_quad_identity_skin_scenario() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("restShape", quad_points());
        let skinned = scene.add_surface("skinShape", quad_points());
        scene
            .bind_skin("skin", rest, skinned, |points| points.to_vec())
            .unwrap();
        let sculpt_points: Vec<Vec3> = quad_points()
            .iter()
            .map(|p| *p + Vec3::new(0.0, 0.0, 0.5))
            .collect();
        let sculpt = scene.add_surface("sculptShape", sculpt_points.clone());

        let deltas = create_corrective_deltas(&mut scene, skinned, sculpt).unwrap();
        assert_points_near(&deltas, &vec![Vec3::new(0.0, 0.0, 0.5); 4]);

        let corrective = create_corrective_shape(&mut scene, rest, &deltas).unwrap();
        assert_points_near(&scene.points(corrective).unwrap(), &sculpt_points);
        // The rest shape itself is untouched.
        assert_eq!(scene.points(rest).unwrap(), quad_points());
    }

    #[test]
    fn rotated_pose_round_trips_through_rest_space() {
        // Skin poses the rig by a rotation; the corrective rebuilt on the
        // rest shape and pushed through the skin again must land on the
        // sculpt.
        let rotation = Quat::from_rotation_z(0.7);
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("restShape", quad_points());
        let posed: Vec<Vec3> = quad_points().iter().map(|p| rotation * *p).collect();
        let skinned = scene.add_surface("skinShape", posed.clone());
        let (deformer, _) = scene
            .bind_skin("skin", rest, skinned, move |points| {
                points.iter().map(|p| rotation * *p).collect()
            })
            .unwrap();

        let sculpt_points: Vec<Vec3> = posed
            .iter()
            .map(|p| *p + Vec3::new(0.1, -0.2, 0.3))
            .collect();
        let sculpt = scene.add_surface("sculptShape", sculpt_points.clone());

        let deltas = create_corrective_deltas(&mut scene, skinned, sculpt).unwrap();
        let corrective = create_corrective_shape(&mut scene, rest, &deltas).unwrap();

        // Feed the corrective through the deformer by swapping it in as the
        // skin input.
        let corrective_points = scene.points(corrective).unwrap();
        scene.set_points(rest, corrective_points).unwrap();
        let reposed = scene.evaluate_deformer(deformer).unwrap();
        assert_points_near(&reposed, &sculpt_points);
    }

    #[test]
    fn zero_delta_sculpt_reconstructs_identically() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("restShape", quad_points());
        let skinned = scene.add_surface("skinShape", quad_points());
        scene
            .bind_skin("skin", rest, skinned, |points| points.to_vec())
            .unwrap();
        // Sculpt equals the nominal output exactly.
        let sculpt = scene.add_surface("sculptShape", quad_points());

        let deltas = create_corrective_deltas(&mut scene, skinned, sculpt).unwrap();
        let corrective = create_corrective_shape(&mut scene, rest, &deltas).unwrap();
        assert_points_near(&scene.points(corrective).unwrap(), &quad_points());
    }

    #[test]
    fn missing_binding_is_reported() {
        let mut scene = MemoryScene::new();
        let lone = scene.add_surface("lone", quad_points());
        let sculpt = scene.add_surface("sculpt", quad_points());

        let err = create_corrective_deltas(&mut scene, lone, sculpt).unwrap_err();
        assert!(matches!(err, CorrectiveError::BindingNotFound));
    }

    #[test]
    fn topology_mismatch_creates_nothing() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("restShape", quad_points());
        let skinned = scene.add_surface("skinShape", quad_points());
        scene
            .bind_skin("skin", rest, skinned, |points| points.to_vec())
            .unwrap();
        let sculpt = scene.add_surface("sculptShape", vec![Vec3::ZERO; 3]);
        let nodes_before = scene.live_node_count();

        let err = create_corrective_deltas(&mut scene, skinned, sculpt).unwrap_err();
        assert!(matches!(err, CorrectiveError::PointCountMismatch { .. }));
        assert_eq!(scene.live_node_count(), nodes_before);

        let err = create_corrective_shape(&mut scene, rest, &[Vec3::ZERO; 2]).unwrap_err();
        assert!(matches!(err, CorrectiveError::PointCountMismatch { .. }));
        assert_eq!(scene.live_node_count(), nodes_before);
    }

    #[test]
    fn resolve_surface_validates_paths() {
        let mut scene = MemoryScene::new();
        let surface = scene.add_surface("restShape", quad_points());
        let group = scene.add_node("rig");

        assert_eq!(resolve_surface(&scene, "restShape").unwrap(), surface);
        assert!(matches!(
            resolve_surface(&scene, "nope").unwrap_err(),
            CorrectiveError::ObjectNotFound(_)
        ));
        scene.set_selection(vec![group, surface]);
        assert_eq!(selected_surfaces(&scene), vec![surface]);
    }

    #[test]
    fn non_surface_arguments_are_rejected() {
        let mut scene = MemoryScene::new();
        let rest = scene.add_surface("restShape", quad_points());
        let group = scene.add_node("rig");

        let err = create_corrective_deltas(&mut scene, group, rest).unwrap_err();
        assert!(matches!(err, CorrectiveError::NotASurface(_)));
    }
}
