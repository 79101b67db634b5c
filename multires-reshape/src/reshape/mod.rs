//! Reshaping of multires displacement grids.
//!
//! Displacement is stored per face corner in tangent space: relative to the
//! limit surface of the base mesh, in a frame built from the limit surface
//! derivatives. Reshaping converts grids to object space, changes them there
//! and converts them back. Changes are copies of sculpted coordinates or of
//! subdivided vertex positions, deformations, or resampling of a previous
//! state.
//!
//! A [`ReshapeContext`] bundles everything one such operation needs: the
//! limit surface evaluator, face/grid/ptex lookup tables, mutable access to
//! the displacement and paint mask layers of the base mesh and an optional
//! snapshot of the grids taken before the operation started.
//!
//! ## Example
//! ```
//! # use multires_reshape::{
//! #     mesh::Mesh,
//! #     object::{ModifierData, ModifierKind, MultiresModifier, Object},
//! #     reshape::ReshapeContext,
//! # };
//! # use ultraviolet::Vec3;
//! let mut mesh = Mesh::new(
//!     vec![
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 0.0),
//!         Vec3::new(1.0, 1.0, 0.0),
//!         Vec3::new(0.0, 1.0, 0.0),
//!     ],
//!     &[4],
//!     &[0, 1, 2, 3],
//! )?;
//! mesh.add_displacement_layer();
//!
//! let mut object = Object::new("Plane", mesh);
//! let multires = object.push_modifier(ModifierData::new(
//!     "Multires",
//!     ModifierKind::Multires(MultiresModifier {
//!         total_levels: 2,
//!         ..Default::default()
//!     }),
//! ));
//!
//! let mut reshape = ReshapeContext::create_from_modifier(&mut object, multires, 2)?;
//! reshape.ensure_grids(2);
//! reshape.assign_final_coords_from_mdisps();
//! reshape.object_grids_to_tangent_displacement();
//! # Ok::<(), multires_reshape::Error>(())
//! ```
use std::ops::Deref;

use derive_more::Display;
use tracing::{debug, warn};
use ultraviolet::{Mat3, Vec3};

use crate::{
    ccg::SubdivCcg,
    depsgraph::{Depsgraph, EvaluationMode},
    mesh::{CornerData, Mesh},
    object::{multires_modifier, ModifierData, MultiresModifier, Object, ObjectMode},
    subdiv::{
        grid_size_from_level, EvaluatorType, LimitEvaluator, LimitSample, Subdiv, SubdivSettings,
    },
    Error, Result,
};

mod addressing;
mod displacement;
mod foreach;
mod tangent;
mod vertcos;
mod workflows;

pub use addressing::{FaceTopology, GridCoord, PTexCoord};
pub use displacement::{downsample_grids, ensure_grids, OrigGridElement, OriginalGrids};
pub use foreach::{foreach_grid_coordinate, FaceGrids, GridElement, GridLayersMut};
pub use tangent::tangent_matrix;
pub use vertcos::{foreach_subdiv_vertex, subdiv_vertices_len};
pub use workflows::{
    delete_higher_levels, reshape_from_ccg, reshape_from_deform_modifier, reshape_from_object,
    reshape_from_vertcos, subdivide_to_level, SubdivideMode,
};

/// A subdivision level and the grid size it implies.
#[derive(Display, Copy, Clone, Debug, PartialEq, Eq)]
#[display("{level} ({grid_size}x{grid_size})")]
pub struct Level {
    level: usize,
    grid_size: usize,
}

impl Level {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            grid_size: grid_size_from_level(level),
        }
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }
}

/// A subdivision surface a context either owns or borrows.
#[derive(Debug)]
pub enum SubdivHandle<'a> {
    Owned(Box<Subdiv>),
    Borrowed(&'a Subdiv),
}

impl SubdivHandle<'_> {
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

impl Deref for SubdivHandle<'_> {
    type Target = Subdiv;

    fn deref(&self) -> &Subdiv {
        match self {
            Self::Owned(subdiv) => subdiv,
            Self::Borrowed(subdiv) => subdiv,
        }
    }
}

/// Read-only state grid passes sample the limit surface with.
#[derive(Clone, Copy)]
pub(crate) struct LimitSampler<'c> {
    topology: &'c FaceTopology,
    evaluator: &'c LimitEvaluator,
}

impl LimitSampler<'_> {
    fn new<'c>(topology: &'c FaceTopology, subdiv: &'c SubdivHandle) -> LimitSampler<'c> {
        let Some(evaluator) = subdiv.limit_evaluator() else {
            unreachable!("evaluator readiness is checked on construction");
        };
        LimitSampler {
            topology,
            evaluator,
        }
    }

    pub(crate) fn evaluate_limit_at_grid(&self, grid_coord: &GridCoord) -> (Vec3, Mat3) {
        evaluate_limit_at_grid(self.topology, self.evaluator, grid_coord)
    }
}

fn tangent_matrix_for_corner(
    topology: &FaceTopology,
    face: usize,
    corner: usize,
    dpdu: Vec3,
    dpdv: Vec3,
) -> Mat3 {
    let corner = if topology.is_quad_face(face) { corner } else { 0 };
    tangent_matrix(dpdu, dpdv, corner)
}

fn evaluate_limit_at_grid(
    topology: &FaceTopology,
    evaluator: &LimitEvaluator,
    grid_coord: &GridCoord,
) -> (Vec3, Mat3) {
    let ptex_coord = topology.grid_coord_to_ptex(grid_coord);
    let sample = evaluator
        .evaluate(ptex_coord.ptex_face_index, ptex_coord.u, ptex_coord.v)
        .unwrap_or_else(|| {
            // A zero frame turns into zero displacement.
            warn!(?ptex_coord, "no limit patch at ptex coordinate");
            LimitSample::default()
        });
    let face = topology.grid_to_face_index(grid_coord.grid_index);
    let corner = topology.grid_to_corner(grid_coord.grid_index);
    (
        sample.p,
        tangent_matrix_for_corner(topology, face, corner, sample.dpdu, sample.dpdv),
    )
}

fn evaluated_subdiv<'a>(multires: &MultiresModifier, mesh: &Mesh) -> Result<SubdivHandle<'a>> {
    let mut subdiv = Subdiv::new_from_mesh(SubdivSettings::from_multires(multires), mesh)?;
    subdiv.eval_begin_from_mesh(mesh, EvaluatorType::Cpu)?;
    Ok(SubdivHandle::Owned(Box::new(subdiv)))
}

/// State of one reshape operation on the displacement grids of a base mesh.
///
/// Exists only for meshes that have a displacement layer. Borrows that layer
/// (and the paint mask layer, if any) mutably for its whole lifetime.
#[derive(Debug)]
pub struct ReshapeContext<'a> {
    subdiv: SubdivHandle<'a>,
    /// Base mesh topology with the positions the limit surface is built
    /// from.
    cage: Mesh,
    topology: FaceTopology,
    reshape: Level,
    top: Level,
    layers: GridLayersMut<'a>,
    orig: Option<OriginalGrids>,
}

impl<'a> ReshapeContext<'a> {
    /// Creates a context evaluating the limit surface of the object's base
    /// mesh as is, ignoring any modifiers.
    ///
    /// The reshape level is the multires level shown in the object's mode.
    pub fn create_from_base_mesh(
        depsgraph: &Depsgraph,
        object: &'a mut Object,
        multires_index: usize,
    ) -> Result<Self> {
        let multires = *object.multires_modifier(multires_index)?;
        let subdiv = evaluated_subdiv(&multires, &object.mesh)?;
        debug!(object = %object.name, mode = %depsgraph.mode, "evaluating base mesh");
        let cage = object.mesh.clone_topology();
        Self::finish_construction(
            "base mesh",
            &mut object.mesh,
            cage,
            subdiv,
            multires.level(object.mode, EvaluationMode::Viewport),
            multires.total_levels,
        )
    }

    /// Creates a context evaluating the limit surface of the object's base
    /// mesh deformed by the enabled deform modifiers in front of the multires
    /// modifier.
    pub fn create_from_object(
        depsgraph: &Depsgraph,
        object: &'a mut Object,
        multires_index: usize,
    ) -> Result<Self> {
        let Object {
            name,
            mesh,
            mode,
            modifiers,
        } = object;
        Self::create_from_object_parts(depsgraph, name, mesh, *mode, modifiers, multires_index)
    }

    pub(crate) fn create_from_object_parts(
        depsgraph: &Depsgraph,
        name: &str,
        mesh: &'a mut Mesh,
        mode: ObjectMode,
        modifiers: &[ModifierData],
        multires_index: usize,
    ) -> Result<Self> {
        let multires = *multires_modifier(modifiers, multires_index)?;
        let deformed = depsgraph.deform_mesh(name, mesh, modifiers, multires_index);
        let subdiv = evaluated_subdiv(&multires, &deformed)?;
        Self::finish_construction(
            "object",
            mesh,
            deformed,
            subdiv,
            multires.level(mode, EvaluationMode::Viewport),
            multires.total_levels,
        )
    }

    /// Creates a context borrowing the evaluator of a sculpt grid set. The
    /// reshape level is the level of the dense grids.
    pub fn create_from_ccg(ccg: &'a SubdivCcg, base_mesh: &'a mut Mesh, top_level: usize) -> Result<Self> {
        let cage = base_mesh.clone_topology();
        Self::finish_construction(
            "ccg",
            base_mesh,
            cage,
            SubdivHandle::Borrowed(&ccg.subdiv),
            ccg.level,
            top_level,
        )
    }

    /// Creates a context evaluating the limit surface of the object's base
    /// mesh. The reshape level is the modifier's total level.
    pub fn create_from_modifier(object: &'a mut Object, multires_index: usize, top_level: usize) -> Result<Self> {
        let multires = *object.multires_modifier(multires_index)?;
        let subdiv = evaluated_subdiv(&multires, &object.mesh)?;
        let cage = object.mesh.clone_topology();
        Self::finish_construction(
            "modifier",
            &mut object.mesh,
            cage,
            subdiv,
            multires.total_levels,
            top_level,
        )
    }

    /// Creates a context borrowing an evaluator the caller has already
    /// started. The reshape level is the modifier's total level.
    pub fn create_from_subdiv(
        object: &'a mut Object,
        multires_index: usize,
        subdiv: &'a Subdiv,
        top_level: usize,
    ) -> Result<Self> {
        let multires = *object.multires_modifier(multires_index)?;
        let cage = object.mesh.clone_topology();
        Self::finish_construction(
            "subdiv",
            &mut object.mesh,
            cage,
            SubdivHandle::Borrowed(subdiv),
            multires.total_levels,
            top_level,
        )
    }

    fn finish_construction(
        source: &'static str,
        mesh: &'a mut Mesh,
        cage: Mesh,
        subdiv: SubdivHandle<'a>,
        reshape_level: usize,
        top_level: usize,
    ) -> Result<Self> {
        if !subdiv.is_evaluator_ready() {
            return Err(Error::EvaluatorNotReady);
        }
        if subdiv.vertices_per_face().len() != mesh.faces_len() {
            return Err(Error::TopologyMismatch {
                expected: subdiv.vertices_per_face().len(),
                actual: mesh.faces_len(),
            });
        }
        if let Some((&expected, &actual)) = subdiv
            .vertices_per_face()
            .iter()
            .zip(mesh.vertices_per_face())
            .find(|(expected, actual)| expected != actual)
        {
            return Err(Error::TopologyMismatch {
                expected: expected as usize,
                actual: actual as usize,
            });
        }
        debug_assert!(
            top_level >= reshape_level,
            "top level {} is below reshape level {}",
            top_level,
            reshape_level
        );

        let topology = FaceTopology::new(mesh, subdiv.face_ptex_offset());
        let grids_len = topology.grids_len();

        let CornerData {
            displacement,
            paint_mask,
        } = &mut mesh.corner_data;
        let displacement = displacement.as_deref_mut().ok_or(Error::NoDisplacementLayer)?;
        if displacement.len() != grids_len {
            return Err(Error::GridCountMismatch {
                expected: grids_len,
                actual: displacement.len(),
            });
        }
        let paint_mask = paint_mask.as_deref_mut();
        if let Some(paint_mask) = &paint_mask {
            if paint_mask.len() != grids_len {
                return Err(Error::GridCountMismatch {
                    expected: grids_len,
                    actual: paint_mask.len(),
                });
            }
        }

        let reshape = Level::new(reshape_level);
        let top = Level::new(top_level);
        debug!(
            source,
            reshape = %reshape,
            top = %top,
            grids = grids_len,
            ptex_faces = topology.ptex_faces_len(),
            owned_subdiv = subdiv.is_owned(),
            "created reshape context"
        );

        Ok(Self {
            subdiv,
            cage,
            topology,
            reshape,
            top,
            layers: GridLayersMut {
                displacement,
                paint_mask,
            },
            orig: None,
        })
    }

    /// The level the displacement is currently shown at.
    #[inline]
    pub fn reshape_level(&self) -> Level {
        self.reshape
    }

    /// The level displacement grids are stored at.
    #[inline]
    pub fn top_level(&self) -> Level {
        self.top
    }

    #[inline]
    pub fn subdiv(&self) -> &Subdiv {
        &self.subdiv
    }

    /// The control cage of the limit surface.
    #[inline]
    pub fn cage(&self) -> &Mesh {
        &self.cage
    }

    #[inline]
    pub fn topology(&self) -> &FaceTopology {
        &self.topology
    }

    #[inline]
    pub fn grid_to_face_index(&self, grid_index: usize) -> usize {
        self.topology.grid_to_face_index(grid_index)
    }

    #[inline]
    pub fn grid_to_corner(&self, grid_index: usize) -> usize {
        self.topology.grid_to_corner(grid_index)
    }

    #[inline]
    pub fn is_quad_face(&self, face: usize) -> bool {
        self.topology.is_quad_face(face)
    }

    #[inline]
    pub fn grid_to_ptex_index(&self, grid_index: usize) -> usize {
        self.topology.grid_to_ptex_index(grid_index)
    }

    #[inline]
    pub fn grid_coord_to_ptex(&self, grid_coord: &GridCoord) -> PTexCoord {
        self.topology.grid_coord_to_ptex(grid_coord)
    }

    #[inline]
    pub fn ptex_coord_to_grid(&self, ptex_coord: &PTexCoord) -> GridCoord {
        self.topology.ptex_coord_to_grid(ptex_coord)
    }

    /// Tangent matrix of a face corner. Non-quad faces use the frame of
    /// corner `0` for every corner.
    pub fn tangent_matrix_for_corner(&self, face: usize, corner: usize, dpdu: Vec3, dpdv: Vec3) -> Mat3 {
        tangent_matrix_for_corner(&self.topology, face, corner, dpdu, dpdv)
    }

    /// Limit surface point and tangent matrix at a grid coordinate.
    pub fn evaluate_limit_at_grid(&self, grid_coord: &GridCoord) -> (Vec3, Mat3) {
        LimitSampler::new(&self.topology, &self.subdiv).evaluate_limit_at_grid(grid_coord)
    }

    /// Mutable access to the live sample nearest to `grid_coord`, looked up
    /// at the top level grid size. Grids not stored at the top level are
    /// absent.
    pub fn grid_element_for_grid_coord(&mut self, grid_coord: &GridCoord) -> GridElement<'_> {
        GridElement::lookup(
            &mut self.layers.displacement[grid_coord.grid_index],
            self.layers
                .paint_mask
                .as_deref_mut()
                .map(|mask| &mut mask[grid_coord.grid_index]),
            self.top.level,
            grid_coord,
        )
    }

    pub fn grid_element_for_ptex_coord(&mut self, ptex_coord: &PTexCoord) -> GridElement<'_> {
        let grid_coord = self.topology.ptex_coord_to_grid(ptex_coord);
        self.grid_element_for_grid_coord(&grid_coord)
    }

    /// Runs a pass at the top level with the limit sampler and the snapshot
    /// available to the callback.
    pub(crate) fn for_each_sample<F>(&mut self, callback: F)
    where
        F: Fn(&LimitSampler, Option<&OriginalGrids>, &GridCoord, &mut FaceGrids) + Sync,
    {
        let sampler = LimitSampler::new(&self.topology, &self.subdiv);
        let orig = self.orig.as_ref();
        foreach_grid_coordinate(
            &self.topology,
            &mut self.layers,
            self.top.level,
            |grid_coord, grids| callback(&sampler, orig, grid_coord, grids),
        );
    }
}

impl Drop for ReshapeContext<'_> {
    fn drop(&mut self) {
        debug!(
            owned_subdiv = self.subdiv.is_owned(),
            original_grids = self.orig.is_some(),
            "freeing reshape context"
        );
    }
}
