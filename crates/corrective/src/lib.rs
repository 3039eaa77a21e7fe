//! Corrective blend-target generation for skinned character rigs.
//!
//! Given a sculpted pose correction and the rig's skin deformation at the
//! current pose, this crate factors the skinning out of the sculpt to
//! produce pose-independent rest-space deltas, and rebuilds a corrective
//! shape from stored deltas.
//!
//! # Architecture
//!
//! - **Probe**: locates the deformer bound to a surface (upstream graph walk
//!   plus membership-set confirmation) and measures the deformer's response
//!   to unit X/Y/Z offsets at every vertex, restoring the scene afterwards.
//! - **Frames**: builds a per-vertex affine frame from the measured basis,
//!   inverts it, and maps sculpted points back into undeformed space; the
//!   inverse direction adds deltas onto rest points.
//! - **Generator**: the two host-facing entry points, plus input validation
//!   helpers for paths and selections.
//!
//! # Usage
//!
//! ```ignore
//! let deltas = create_corrective_deltas(&mut scene, generator_shape, sculpt_shape)?;
//! let shape = create_corrective_shape(&mut scene, rest_shape, &deltas)?;
//! ```

mod error;
pub mod frames;
pub mod generator;
pub mod probe;

pub use error::CorrectiveError;
pub use frames::{apply_deltas, compute_deltas, inverse_frames, vertex_frame};
pub use generator::{
    create_corrective_deltas, create_corrective_shape, resolve_surface, selected_surfaces,
};
pub use probe::{probe_unit_responses, resolve_deformer_binding, DeformerBinding, UnitResponses};
