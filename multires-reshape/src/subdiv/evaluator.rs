//! Limit surface evaluation at ptex coordinates.
use bytemuck::cast_slice;
use opensubdiv_petite::far::{
    EndCapType, PatchMap, PatchTable, PatchTableOptions, PrimvarRefiner, TopologyRefiner,
};
use tracing::trace;
use ultraviolet::Vec3;

use crate::{Error, Result};

/// A point on the limit surface together with its partial derivatives along
/// the ptex face axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LimitSample {
    pub p: Vec3,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
}

/// Evaluates the patches of a refined topology.
///
/// Control points are the vertices of every refinement level, in level
/// order, followed by the local points of the patch table's end caps.
pub struct LimitEvaluator {
    patch_table: PatchTable,
    patch_map: PatchMap,
    control_points: Vec<[f32; 3]>,
    ptex_faces_len: usize,
}

impl std::fmt::Debug for LimitEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitEvaluator")
            .field("patches", &self.patch_table.patches_len())
            .field("control_points", &self.control_points.len())
            .field("ptex_faces", &self.ptex_faces_len)
            .finish()
    }
}

impl LimitEvaluator {
    /// Builds the patch table of an already refined `refiner` and computes
    /// its control points from the base level `positions`.
    pub(crate) fn new(
        refiner: &TopologyRefiner,
        positions: &[[f32; 3]],
        ptex_faces_len: usize,
    ) -> Result<Self> {
        let options = PatchTableOptions::new()
            .end_cap_type(EndCapType::GregoryBasis)
            .use_inf_sharp_patch(true);
        let patch_table = PatchTable::new(refiner, Some(options))?;
        let patch_map = PatchMap::new(&patch_table)
            .ok_or_else(|| Error::CreateSubdivFailed("Failed to create patch map.".to_string()))?;

        let mut control_points =
            Vec::with_capacity(refiner.vertex_total_count() + patch_table.local_point_count());
        control_points.extend_from_slice(positions);

        let primvar_refiner = PrimvarRefiner::new(refiner)?;
        let mut level_start = 0;
        for level in 1..=refiner.max_level() {
            let refined = primvar_refiner
                .interpolate(level, 3, cast_slice(&control_points[level_start..]))
                .ok_or_else(|| {
                    Error::CreateSubdivFailed(format!("Failed to refine level {}.", level))
                })?;
            level_start = control_points.len();
            control_points.extend_from_slice(cast_slice::<f32, [f32; 3]>(&refined));
        }

        let local_points_len = patch_table.local_point_count();
        if local_points_len > 0 {
            let stencils = patch_table.local_point_stencil_table().ok_or_else(|| {
                Error::CreateSubdivFailed("Missing local point stencils.".to_string())
            })?;
            let mut local_points = vec![[0.0f32; 3]; local_points_len];
            for axis in 0..3 {
                let src: Vec<f32> = control_points.iter().map(|point| point[axis]).collect();
                for (local_point, value) in local_points
                    .iter_mut()
                    .zip(stencils.update_values(&src, None, None))
                {
                    local_point[axis] = value;
                }
            }
            control_points.extend_from_slice(&local_points);
        }

        trace!(
            levels = refiner.max_level(),
            patches = patch_table.patches_len(),
            control_points = control_points.len(),
            local_points = local_points_len,
            "built limit patches"
        );

        Ok(Self {
            patch_table,
            patch_map,
            control_points,
            ptex_faces_len,
        })
    }

    /// Returns the number of ptex faces this evaluator covers.
    #[inline]
    pub fn ptex_faces_len(&self) -> usize {
        self.ptex_faces_len
    }

    /// Returns the number of patches the limit surface is made of.
    #[inline]
    pub fn patches_len(&self) -> usize {
        self.patch_table.patches_len()
    }

    /// Evaluates the limit surface at `(u, v)` of the given ptex face.
    ///
    /// Coordinates are clamped to `[0, 1]`. Returns `None` if no patch
    /// covers the location.
    pub fn evaluate(&self, ptex_face: usize, u: f32, v: f32) -> Option<LimitSample> {
        if ptex_face >= self.ptex_faces_len {
            return None;
        }
        let (u, v) = (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0));
        let (patch, _, _) = self.patch_map.find_patch(ptex_face, u, v)?;
        // Patch evaluation normalizes face coordinates into the patch and
        // scales derivatives back to the face.
        let result = self
            .patch_table
            .evaluate_point(patch, u, v, &self.control_points)?;
        Some(LimitSample {
            p: Vec3::from(result.point),
            dpdu: Vec3::from(result.du),
            dpdv: Vec3::from(result.dv),
        })
    }
}
