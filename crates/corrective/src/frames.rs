//! Per-vertex affine frame math: the Delta Math Engine.
//!
//! The probe measures, at every vertex, how the deformer transported a unit
//! offset along each axis. Those three basis vectors plus the deformer's
//! nominal output position form an affine frame describing the deformer's
//! local linear+translation behavior at that vertex. Inverting the frame and
//! pushing a sculpted point through it yields the sculpt's offset in the
//! undeformed rest space.

use glam::{Mat4, Vec3};

use crate::error::CorrectiveError;
use crate::probe::UnitResponses;

/// Build the affine frame for one vertex.
///
/// Columns are the measured basis `(smear - nominal)` for X, Y, Z and the
/// nominal position as the homogeneous translation. With column-vector
/// transforms this maps rest-space offsets to posed positions:
/// `frame * (d, 1) = d.x*ox + d.y*oy + d.z*oz + nominal`.
pub fn vertex_frame(nominal: Vec3, smear_x: Vec3, smear_y: Vec3, smear_z: Vec3) -> Mat4 {
    let ox = smear_x - nominal;
    let oy = smear_y - nominal;
    let oz = smear_z - nominal;
    Mat4::from_cols(
        ox.extend(0.0),
        oy.extend(0.0),
        oz.extend(0.0),
        nominal.extend(1.0),
    )
}

/// Invert the per-vertex frames for a full probe result.
///
/// The deformer is a black box: a smear set whose count disagrees with the
/// nominal output is rejected up front rather than indexed. A singular frame
/// means the deformer collapsed the probe basis at that vertex; the whole
/// operation fails with the offending index.
pub fn inverse_frames(responses: &UnitResponses) -> Result<Vec<Mat4>, CorrectiveError> {
    let count = responses.nominal.len();
    for smear in [&responses.smear_x, &responses.smear_y, &responses.smear_z] {
        if smear.len() != count {
            return Err(CorrectiveError::PointCountMismatch {
                expected: count,
                actual: smear.len(),
            });
        }
    }

    let mut inverses = Vec::with_capacity(count);
    for vertex in 0..count {
        let frame = vertex_frame(
            responses.nominal[vertex],
            responses.smear_x[vertex],
            responses.smear_y[vertex],
            responses.smear_z[vertex],
        );
        // Tolerance scales with the basis magnitudes so a uniformly small
        // (but invertible) response is not mistaken for a degenerate one.
        let basis_scale = frame.x_axis.truncate().length()
            * frame.y_axis.truncate().length()
            * frame.z_axis.truncate().length();
        let det = frame.determinant();
        if !det.is_finite() || det.abs() <= basis_scale * f32::EPSILON {
            return Err(CorrectiveError::SingularFrame { vertex });
        }
        inverses.push(frame.inverse());
    }
    Ok(inverses)
}

/// Map sculpted points back into the deformer's undeformed space.
///
/// Point-for-point correspondence by index: sculpt and probed surfaces must
/// share topology and point ordering. The count is checked up front; no
/// partial result is produced.
pub fn compute_deltas(
    responses: &UnitResponses,
    sculpt_points: &[Vec3],
) -> Result<Vec<Vec3>, CorrectiveError> {
    if sculpt_points.len() != responses.nominal.len() {
        return Err(CorrectiveError::PointCountMismatch {
            expected: responses.nominal.len(),
            actual: sculpt_points.len(),
        });
    }
    let inverses = inverse_frames(responses)?;
    Ok(sculpt_points
        .iter()
        .zip(&inverses)
        .map(|(point, inverse)| inverse.transform_point3(*point))
        .collect())
}

/// Add stored deltas onto rest points: `corrective[i] = rest[i] + delta[i]`.
///
/// Pure over points; the count check runs before any indexing.
pub fn apply_deltas(rest_points: &[Vec3], deltas: &[Vec3]) -> Result<Vec<Vec3>, CorrectiveError> {
    if deltas.len() != rest_points.len() {
        return Err(CorrectiveError::PointCountMismatch {
            expected: rest_points.len(),
            actual: deltas.len(),
        });
    }
    Ok(rest_points
        .iter()
        .zip(deltas)
        .map(|(rest, delta)| *rest + *delta)
        .collect())
}
