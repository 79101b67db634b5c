//! Error types for the multires-reshape crate.

use thiserror::Error;

/// Main error type for reshape operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid topology descriptor.
    #[error("Invalid topology descriptor: {0}")]
    InvalidTopology(String),

    /// The subdivision evaluator could not be created.
    #[error("Failed to create subdivision evaluator: {0}")]
    CreateSubdivFailed(String),

    /// No patch covers the requested ptex face location.
    #[error("Limit evaluation failed on ptex face {ptex_face}")]
    LimitEvaluationFailed { ptex_face: usize },

    /// Limit evaluation was requested before evaluation was started.
    #[error("Subdivision evaluator has not been started (call `eval_begin_from_mesh()` first)")]
    EvaluatorNotReady,

    /// The mesh given to the evaluator does not match the topology it was
    /// created from.
    #[error("Topology mismatch: evaluator expects {expected} elements, mesh has {actual}")]
    TopologyMismatch { expected: usize, actual: usize },

    /// The base mesh carries no multires displacement layer.
    #[error("Mesh has no multires displacement layer")]
    NoDisplacementLayer,

    /// No modifier at the given stack index.
    #[error("No modifier at index {0}")]
    ModifierNotFound(usize),

    /// The modifier at the given stack index is not a multires modifier.
    #[error("Modifier at index {0} is not a multires modifier")]
    NotMultires(usize),

    /// The modifier at the given stack index is not a deform modifier.
    #[error("Modifier at index {0} is not a deform modifier")]
    NotDeform(usize),

    /// A deform modifier in front of the multires modifier is already part
    /// of the surface the displacement is stored against.
    #[error("Deform modifier {deform} must come after multires modifier {multires}")]
    DeformBeforeMultires { deform: usize, multires: usize },

    /// Reshaping needs a multires level above the base mesh.
    #[error("Reshape needs a multires level above 0")]
    ReshapeLevelZero,

    /// The number of given coordinates does not match the vertices of the
    /// subdivided mesh at the reshape level.
    #[error("Vertex count mismatch: subdivided mesh has {expected} vertices, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },

    /// A corner layer does not have one grid per face corner.
    #[error("Grid count mismatch: mesh has {expected} corners, layer has {actual} grids")]
    GridCountMismatch { expected: usize, actual: usize },

    /// Dense grids do not line up with the base mesh grids, either in
    /// count or in samples per grid.
    #[error("CCG mismatch: expected {expected}, got {actual}")]
    CcgMismatch { expected: usize, actual: usize },
}

impl From<opensubdiv_petite::Error> for Error {
    fn from(err: opensubdiv_petite::Error) -> Self {
        match err {
            opensubdiv_petite::Error::InvalidTopology(message) => Error::InvalidTopology(message),
            err => Error::CreateSubdivFailed(err.to_string()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
