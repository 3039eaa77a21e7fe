//! Error types for corrective generation.

use scenegraph::{NodeId, SceneError};

/// Errors that can occur while deriving or applying correctives.
#[derive(Debug, thiserror::Error)]
pub enum CorrectiveError {
    /// No deformer upstream of the surface passed both the connection check
    /// and the membership-set check.
    #[error("no skin deformer drives this surface")]
    BindingNotFound,

    #[error("scene object not found: {0}")]
    ObjectNotFound(String),

    #[error("node {0:?} is not a deformable surface")]
    NotASurface(NodeId),

    /// Sculpt, rest, and generator surfaces must share topology; detected
    /// before any indexing.
    #[error("point count mismatch: expected {expected} points, got {actual}")]
    PointCountMismatch { expected: usize, actual: usize },

    /// The measured deformation basis at this vertex is not invertible.
    /// Fatal for the whole operation; no partial output is produced.
    #[error("singular deformation frame at vertex {vertex}")]
    SingularFrame { vertex: usize },

    /// Probing substitutes the deformer's input connection, so the input
    /// must be fed by a live connection to begin with.
    #[error("deformer {0:?} has no input connection to probe")]
    InputNotConnected(NodeId),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
