//! # Multires Displacement Reshaping
//!
//! Multires stores sculpted detail as displacement on top of the
//! [subdivision surface](https://en.wikipedia.org/wiki/Subdivision_surface)
//! limit of a coarse base mesh. Every face corner owns a square grid of
//! displacement samples at the highest subdivision level. Samples are stored
//! in tangent space, relative to a frame built from the limit surface
//! derivatives, so the detail follows the base mesh when it deforms.
//!
//! This crate converts these grids between tangent space and object space
//! and implements the operations that need to do so:
//!
//! * [`reshape_from_ccg()`](reshape::reshape_from_ccg) bakes sculpted dense
//!   grids into displacement.
//! * [`reshape_from_deform_modifier()`](reshape::reshape_from_deform_modifier)
//!   applies a deform modifier to the displaced surface.
//! * [`subdivide_to_level()`](reshape::subdivide_to_level) carries existing
//!   displacement over to a higher level.
//!
//! The building blocks are public: [`ReshapeContext`](reshape::ReshapeContext)
//! with its grid passes, the grid/ptex addressing in
//! [`FaceTopology`](reshape::FaceTopology) and the limit surface evaluator in
//! [`subdiv`].
//!
//! ## Limit Surface
//!
//! Limit evaluation is done by
//! [*OpenSubdiv*](https://graphics.pixar.com/opensubdiv/) through
//! [`opensubdiv-petite`](https://docs.rs/opensubdiv-petite/). The base mesh
//! is refined adaptively around extraordinary vertices and creases and the
//! resulting patches are evaluated directly, so regular regions of the limit
//! surface are exact.
//!
//! ## Cargo Features
#![doc = document_features::document_features!()]

pub mod ccg;
pub mod depsgraph;
mod error;
pub mod mesh;
pub mod object;
pub mod reshape;
pub mod subdiv;

pub use error::{Error, Result};
