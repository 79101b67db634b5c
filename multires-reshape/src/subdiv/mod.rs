//! Subdivision surface evaluation.
//!
//! A [`Subdiv`] is created from the topology of a base mesh. Once evaluation
//! has been started with [`Subdiv::eval_begin_from_mesh()`] the limit surface
//! can be sampled at any ptex face coordinate.
//!
//! ## Example
//! ```
//! # use multires_reshape::{mesh::Mesh, subdiv::{EvaluatorType, Subdiv, SubdivSettings}};
//! # use ultraviolet::Vec3;
//! let mesh = Mesh::new(
//!     vec![
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 0.0),
//!         Vec3::new(1.0, 1.0, 0.0),
//!         Vec3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[4],
//!     &[0, 1, 2, 3],
//! )?;
//!
//! let mut subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &mesh)?;
//! subdiv.eval_begin_from_mesh(&mesh, EvaluatorType::Cpu)?;
//!
//! let sample = subdiv.eval_limit_point_and_derivatives(0, 0.5, 0.5)?;
//! assert!(sample.p.z.abs() < 1e-6);
//! # Ok::<(), multires_reshape::Error>(())
//! ```
use bytemuck::cast_slice;
use opensubdiv_petite::far::{
    AdaptiveRefinementOptions, TopologyDescriptor, TopologyRefiner, TopologyRefinerOptions,
    UniformRefinementOptions,
};
use tracing::{debug, trace};

use crate::{mesh::Mesh, Error, Result};

mod evaluator;
mod ptex;
mod settings;

pub use evaluator::{LimitEvaluator, LimitSample};
pub use ptex::{
    grid_size_from_level, grid_uv_to_ptex_face_uv, ptex_face_uv_to_grid_uv, rotate_grid_to_quad,
    rotate_quad_to_corner,
};
pub use settings::{BoundaryInterpolation, FaceVaryingLinearInterpolation, Scheme, SubdivSettings};

/// Where limit evaluation runs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EvaluatorType {
    #[default]
    Cpu,
}

/// A subdivision surface built from the topology of a base mesh.
///
/// The handle is `Send + Sync`; limit queries take `&self` and may run
/// concurrently.
#[derive(Debug)]
pub struct Subdiv {
    settings: SubdivSettings,
    vertices_len: usize,
    vertices_per_face: Vec<u32>,
    face_vertices: Vec<u32>,
    creases: Vec<[u32; 2]>,
    crease_sharpness: Vec<f32>,
    face_ptex_offset: Vec<usize>,
    ptex_faces_len: usize,
    evaluator: Option<LimitEvaluator>,
}

impl Subdiv {
    /// Creates a subdivision surface for the topology of `mesh`.
    ///
    /// Positions are not read; call [`eval_begin_from_mesh()`](Self::eval_begin_from_mesh)
    /// before evaluating. Edge creases of the mesh are only taken over if
    /// [`use_creases`](SubdivSettings::use_creases) is set.
    pub fn new_from_mesh(settings: SubdivSettings, mesh: &Mesh) -> Result<Self> {
        let mut face_ptex_offset = Vec::with_capacity(mesh.faces_len());
        let mut ptex_faces_len = 0;
        for &arity in mesh.vertices_per_face() {
            face_ptex_offset.push(ptex_faces_len);
            ptex_faces_len += if arity == 4 { 1 } else { arity as usize };
        }

        let (creases, crease_sharpness) = if settings.use_creases {
            (
                mesh.edge_creases().to_vec(),
                mesh.edge_crease_sharpness().to_vec(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let subdiv = Self {
            settings,
            vertices_len: mesh.vertices_len(),
            vertices_per_face: mesh.vertices_per_face().to_vec(),
            face_vertices: mesh.corner_verts().to_vec(),
            creases,
            crease_sharpness,
            face_ptex_offset,
            ptex_faces_len,
            evaluator: None,
        };
        // Fails early on topology the refiner rejects.
        subdiv.topology_refiner()?;

        debug!(
            vertices = subdiv.vertices_len,
            faces = subdiv.vertices_per_face.len(),
            ptex_faces = ptex_faces_len,
            creases = subdiv.creases.len(),
            scheme = ?settings.scheme,
            "created subdiv"
        );

        Ok(subdiv)
    }

    /// Returns the settings this surface was created with.
    #[inline]
    pub fn settings(&self) -> &SubdivSettings {
        &self.settings
    }

    /// Builds an unrefined topology refiner for this surface.
    pub fn topology_refiner(&self) -> Result<TopologyRefiner> {
        let mut descriptor = TopologyDescriptor::new(
            self.vertices_len,
            &self.vertices_per_face,
            &self.face_vertices,
        )?;
        if !self.creases.is_empty() {
            descriptor.creases(cast_slice(&self.creases), &self.crease_sharpness);
        }
        Ok(TopologyRefiner::new(
            descriptor,
            TopologyRefinerOptions::from(&self.settings),
        )?)
    }

    /// Returns the number of vertices of every base face.
    #[inline]
    pub fn vertices_per_face(&self) -> &[u32] {
        &self.vertices_per_face
    }

    /// Returns the index of the first ptex face of every base face.
    #[inline]
    pub fn face_ptex_offset(&self) -> &[usize] {
        &self.face_ptex_offset
    }

    /// Returns the number of ptex faces.
    #[inline]
    pub fn ptex_faces_len(&self) -> usize {
        self.ptex_faces_len
    }

    /// Returns `true` once [`eval_begin_from_mesh()`](Self::eval_begin_from_mesh)
    /// has succeeded.
    #[inline]
    pub fn is_evaluator_ready(&self) -> bool {
        self.evaluator.is_some()
    }

    #[inline]
    pub fn limit_evaluator(&self) -> Option<&LimitEvaluator> {
        self.evaluator.as_ref()
    }

    /// Starts evaluation using the vertex positions of `mesh`.
    ///
    /// The mesh must have the topology this surface was created from. May be
    /// called again to pick up new positions.
    pub fn eval_begin_from_mesh(&mut self, mesh: &Mesh, evaluator_type: EvaluatorType) -> Result<()> {
        if self.vertices_len != mesh.vertices_len() {
            return Err(Error::TopologyMismatch {
                expected: self.vertices_len,
                actual: mesh.vertices_len(),
            });
        }
        if self.face_vertices.len() != mesh.corners_len() {
            return Err(Error::TopologyMismatch {
                expected: self.face_vertices.len(),
                actual: mesh.corners_len(),
            });
        }
        if let Some((&expected, &actual)) = self
            .vertices_per_face
            .iter()
            .zip(mesh.vertices_per_face())
            .find(|(expected, actual)| expected != actual)
        {
            return Err(Error::TopologyMismatch {
                expected: expected as usize,
                actual: actual as usize,
            });
        }

        let mut refiner = self.topology_refiner()?;
        let level = self.settings.isolation_level();
        if self.settings.is_simple() {
            refiner.refine_uniform(UniformRefinementOptions {
                refinement_level: level,
                ..Default::default()
            });
        } else {
            refiner.refine_adaptive(
                AdaptiveRefinementOptions {
                    isolation_level: level,
                    infintely_sharp_patch: true,
                    ..Default::default()
                },
                &[],
            );
        }

        let evaluator = LimitEvaluator::new(
            &refiner,
            cast_slice(mesh.positions()),
            self.ptex_faces_len,
        )?;

        trace!(
            ?evaluator_type,
            level,
            uniform = self.settings.is_simple(),
            patches = evaluator.patches_len(),
            "evaluator ready"
        );
        self.evaluator = Some(evaluator);

        Ok(())
    }

    /// Evaluates the limit point and its derivatives at ptex `(u, v)`.
    pub fn eval_limit_point_and_derivatives(
        &self,
        ptex_face: usize,
        u: f32,
        v: f32,
    ) -> Result<LimitSample> {
        self.evaluator
            .as_ref()
            .ok_or(Error::EvaluatorNotReady)?
            .evaluate(ptex_face, u, v)
            .ok_or(Error::LimitEvaluationFailed { ptex_face })
    }
}
