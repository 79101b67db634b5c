//! Conversions of displacement grids between tangent and object space.
use itertools::iproduct;
use tracing::{debug, warn};
use ultraviolet::Vec3;

use super::{
    addressing::{bilinear_samples, grid_element_index},
    foreach_grid_coordinate, GridCoord, GridElement, ReshapeContext,
};
use crate::{
    ccg::SubdivCcg,
    mesh::{CornerData, DisplacementGrid, Mesh, PaintMaskGrid},
    object::DeformModifier,
    subdiv::{grid_size_from_level, EvaluatorType, LimitSample, Scheme, Subdiv, SubdivSettings},
    Error, Result,
};

/// Copy of the displacement and paint mask layers taken before a reshape
/// operation modifies them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OriginalGrids {
    pub displacement: Vec<DisplacementGrid>,
    pub paint_mask: Option<Vec<PaintMaskGrid>>,
}

impl OriginalGrids {
    /// The sample nearest to `grid_coord`, looked up at the level of the
    /// snapshot grid. Missing data reads as zero.
    pub fn element(&self, grid_coord: &GridCoord) -> OrigGridElement {
        let grid = &self.displacement[grid_coord.grid_index];
        let displacement = grid
            .disps
            .as_ref()
            .map(|disps| disps[grid_element_index(grid.grid_size(), grid_coord.u, grid_coord.v)])
            .unwrap_or_default();

        let mask = self
            .paint_mask
            .as_ref()
            .map(|masks| &masks[grid_coord.grid_index])
            .and_then(|mask| {
                mask.data
                    .as_ref()
                    .map(|data| data[grid_element_index(mask.grid_size(), grid_coord.u, grid_coord.v)])
            })
            .unwrap_or_default();

        OrigGridElement { displacement, mask }
    }

    /// The snapshot bilinearly interpolated at `grid_coord`, at the level of
    /// the snapshot grid. Missing data reads as zero.
    pub fn interpolated_element(&self, grid_coord: &GridCoord) -> OrigGridElement {
        let grid = &self.displacement[grid_coord.grid_index];
        let displacement: [f32; 3] = grid
            .disps
            .as_ref()
            .map(|disps| {
                bilinear_samples(grid.grid_size(), grid_coord.u, grid_coord.v)
                    .iter()
                    .fold(Vec3::zero(), |sum, &(index, _, _, weight)| {
                        sum + Vec3::from(disps[index]) * weight
                    })
                    .into()
            })
            .unwrap_or_default();

        let mask = self
            .paint_mask
            .as_ref()
            .map(|masks| &masks[grid_coord.grid_index])
            .and_then(|mask| {
                mask.data.as_ref().map(|data| {
                    bilinear_samples(mask.grid_size(), grid_coord.u, grid_coord.v)
                        .iter()
                        .map(|&(index, _, _, weight)| data[index] * weight)
                        .sum()
                })
            })
            .unwrap_or_default();

        OrigGridElement { displacement, mask }
    }
}

/// A sample of the snapshot, by value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrigGridElement {
    pub displacement: [f32; 3],
    pub mask: f32,
}

fn ensure_displacement_grids(grids: &mut [DisplacementGrid], level: usize) -> usize {
    let mut grown = 0;
    for grid in grids.iter_mut().filter(|grid| grid.disps.is_none() || grid.level < level) {
        *grid = DisplacementGrid::zeroed(level);
        grown += 1;
    }
    grown
}

fn ensure_mask_grids(grids: &mut [PaintMaskGrid], level: usize) -> usize {
    let mut grown = 0;
    for grid in grids.iter_mut().filter(|grid| grid.data.is_none() || grid.level < level) {
        *grid = PaintMaskGrid::zeroed(level);
        grown += 1;
    }
    grown
}

fn resample<T: Copy>(data: &[T], source_size: usize, grid_size: usize) -> Vec<T> {
    let step = if grid_size > 1 {
        1.0 / (grid_size - 1) as f32
    } else {
        0.0
    };
    iproduct!(0..grid_size, 0..grid_size)
        .map(|(y, x)| data[grid_element_index(source_size, x as f32 * step, y as f32 * step)])
        .collect()
}

/// Resamples every grid of the displacement and paint mask layers to
/// `level`, picking the nearest sample of the stored grid.
///
/// Absent displacement grids become zero-filled grids at `level`. Absent
/// paint mask grids stay absent but take on `level`.
pub fn downsample_grids(mesh: &mut Mesh, level: usize) {
    let grid_size = grid_size_from_level(level);
    let CornerData {
        displacement,
        paint_mask,
    } = &mut mesh.corner_data;

    for grid in displacement.iter_mut().flatten() {
        let resampled = match &grid.disps {
            Some(disps) => DisplacementGrid {
                level,
                disps: Some(resample(disps, grid.grid_size(), grid_size)),
            },
            None => DisplacementGrid::zeroed(level),
        };
        *grid = resampled;
    }
    for mask in paint_mask.iter_mut().flatten() {
        let source_size = mask.grid_size();
        mask.data = mask.data.as_deref().map(|data| resample(data, source_size, grid_size));
        mask.level = level;
    }
    debug!(level, grid_size, "downsampled grids");
}

/// Makes sure every displacement grid, and every paint mask grid if the mesh
/// has a paint mask layer, holds data at `level` or above.
///
/// Grids below `level` and absent grids are replaced by zero-filled grids at
/// `level`; their previous contents are dropped, not resampled. Missing layers
/// are not created.
pub fn ensure_grids(mesh: &mut Mesh, level: usize) {
    let CornerData {
        displacement,
        paint_mask,
    } = &mut mesh.corner_data;
    let grown_displacement = displacement
        .as_deref_mut()
        .map_or(0, |grids| ensure_displacement_grids(grids, level));
    let grown_mask = paint_mask
        .as_deref_mut()
        .map_or(0, |grids| ensure_mask_grids(grids, level));
    if grown_displacement + grown_mask > 0 {
        debug!(level, grown_displacement, grown_mask, "ensured grids");
    }
}

impl ReshapeContext<'_> {
    /// Same as [`ensure_grids()`] on the layers this context borrows.
    pub fn ensure_grids(&mut self, level: usize) {
        let grown_displacement = ensure_displacement_grids(self.layers.displacement, level);
        let grown_mask = self
            .layers
            .paint_mask
            .as_deref_mut()
            .map_or(0, |grids| ensure_mask_grids(grids, level));
        if grown_displacement + grown_mask > 0 {
            debug!(level, grown_displacement, grown_mask, "ensured grids");
        }
    }

    /// Takes a deep copy of the displacement and paint mask layers. Absent
    /// grids stay absent in the copy.
    pub fn store_original_grids(&mut self) {
        self.orig = Some(OriginalGrids {
            displacement: self.layers.displacement.to_vec(),
            paint_mask: self.layers.paint_mask.as_deref().map(<[_]>::to_vec),
        });
        debug!(grids = self.layers.displacement.len(), "stored original grids");
    }

    pub fn free_original_grids(&mut self) {
        if self.orig.take().is_some() {
            debug!("freed original grids");
        }
    }

    #[inline]
    pub fn original_grids(&self) -> Option<&OriginalGrids> {
        self.orig.as_ref()
    }

    /// The snapshot sample nearest to `grid_coord`. Reads as zero without a
    /// snapshot.
    pub fn orig_grid_element_for_grid_coord(&self, grid_coord: &GridCoord) -> OrigGridElement {
        self.orig
            .as_ref()
            .map(|orig| orig.element(grid_coord))
            .unwrap_or_default()
    }

    /// Converts grids holding object space coordinates to tangent space
    /// displacement.
    ///
    /// Samples with a singular tangent matrix get zero displacement.
    pub fn object_grids_to_tangent_displacement(&mut self) {
        self.for_each_sample(|sampler, _, grid_coord, grids| {
            let Some(displacement) = grids.element(grid_coord).displacement else {
                return;
            };
            let (p, tangent_matrix) = sampler.evaluate_limit_at_grid(grid_coord);
            *displacement = if tangent_matrix.determinant() == 0.0 {
                [0.0; 3]
            } else {
                (tangent_matrix.inversed() * (Vec3::from(*displacement) - p)).into()
            };
        });
    }

    /// Converts tangent space displacement to object space coordinates on
    /// the limit surface.
    pub fn assign_final_coords_from_mdisps(&mut self) {
        self.for_each_sample(|sampler, _, grid_coord, grids| {
            let Some(displacement) = grids.element(grid_coord).displacement else {
                return;
            };
            let (p, tangent_matrix) = sampler.evaluate_limit_at_grid(grid_coord);
            *displacement = (p + tangent_matrix * Vec3::from(*displacement)).into();
        });
    }

    /// Writes object space coordinates computed from the snapshot's
    /// displacement, and copies the snapshot's paint mask if the mesh has a
    /// paint mask layer.
    ///
    /// Snapshot grids at a lower level are sampled at their own resolution.
    pub fn assign_final_elements_from_orig_mdisps(&mut self) {
        self.assign_final_elements_with(OriginalGrids::element);
    }

    /// Same as
    /// [`assign_final_elements_from_orig_mdisps()`](Self::assign_final_elements_from_orig_mdisps)
    /// but interpolates the snapshot's tangent displacement and paint mask
    /// bilinearly instead of picking the nearest sample.
    pub fn assign_final_elements_from_orig_mdisps_interpolated(&mut self) {
        self.assign_final_elements_with(OriginalGrids::interpolated_element);
    }

    fn assign_final_elements_with(&mut self, lookup: fn(&OriginalGrids, &GridCoord) -> OrigGridElement) {
        self.for_each_sample(|sampler, orig, grid_coord, grids| {
            let orig_element = orig.map(|orig| lookup(orig, grid_coord)).unwrap_or_default();
            let element = grids.element(grid_coord);
            if let Some(displacement) = element.displacement {
                let (p, tangent_matrix) = sampler.evaluate_limit_at_grid(grid_coord);
                *displacement = (p + tangent_matrix * Vec3::from(orig_element.displacement)).into();
            }
            if let Some(mask) = element.mask {
                *mask = orig_element.mask;
            }
        });
    }

    /// Writes object space coordinates interpolated bilinearly between the
    /// object space positions of the snapshot samples around each sample.
    ///
    /// Absent snapshot grids give the limit surface. Paint masks are
    /// interpolated as by
    /// [`assign_final_elements_from_orig_mdisps_interpolated()`](Self::assign_final_elements_from_orig_mdisps_interpolated).
    pub fn assign_final_coords_from_orig_object_space(&mut self) {
        self.for_each_sample(|sampler, orig, grid_coord, grids| {
            let GridElement { displacement, mask } = grids.element(grid_coord);
            if let Some(displacement) = displacement {
                let orig_grid = orig
                    .map(|orig| &orig.displacement[grid_coord.grid_index])
                    .and_then(|grid| grid.disps.as_deref().map(|disps| (grid.grid_size(), disps)));
                let position = match orig_grid {
                    Some((grid_size, disps)) => bilinear_samples(grid_size, grid_coord.u, grid_coord.v)
                        .iter()
                        .filter(|sample| sample.3 != 0.0)
                        .fold(Vec3::zero(), |sum, &(index, u, v, weight)| {
                            let (p, tangent_matrix) = sampler.evaluate_limit_at_grid(&GridCoord {
                                grid_index: grid_coord.grid_index,
                                u,
                                v,
                            });
                            sum + (p + tangent_matrix * Vec3::from(disps[index])) * weight
                        }),
                    None => sampler.evaluate_limit_at_grid(grid_coord).0,
                };
                *displacement = position.into();
            }
            if let Some(mask) = mask {
                *mask = orig
                    .map(|orig| orig.interpolated_element(grid_coord).mask)
                    .unwrap_or_default();
            }
        });
    }

    /// Writes the object space positions of the control cage subdivided
    /// with bilinear interpolation, so that the grids describe the flat
    /// faces of the cage.
    pub fn assign_final_coords_from_linear_cage(&mut self) -> Result<()> {
        let settings = SubdivSettings {
            scheme: Scheme::Bilinear,
            ..*self.subdiv.settings()
        };
        let mut cage = Subdiv::new_from_mesh(settings, &self.cage)?;
        cage.eval_begin_from_mesh(&self.cage, EvaluatorType::Cpu)?;
        let evaluator = cage.limit_evaluator().ok_or(Error::EvaluatorNotReady)?;
        let topology = &self.topology;

        foreach_grid_coordinate(topology, &mut self.layers, self.top.level, |grid_coord, grids| {
            let Some(displacement) = grids.element(grid_coord).displacement else {
                return;
            };
            let ptex_coord = topology.grid_coord_to_ptex(grid_coord);
            let sample = evaluator
                .evaluate(ptex_coord.ptex_face_index, ptex_coord.u, ptex_coord.v)
                .unwrap_or_else(|| {
                    warn!(?ptex_coord, "no cage patch at ptex coordinate");
                    LimitSample::default()
                });
            *displacement = sample.p.into();
        });

        Ok(())
    }

    /// Copies object space coordinates, and paint masks where both sides have
    /// them, from dense sculpt grids.
    pub fn assign_final_coords_from_ccg(&mut self, ccg: &SubdivCcg) -> Result<()> {
        ccg.validate(self.topology.grids_len())?;
        let ccg_grid_size = ccg.grid_size();

        self.for_each_sample(|_, _, grid_coord, grids| {
            let ccg_grid = &ccg.grids[grid_coord.grid_index];
            let index = grid_element_index(ccg_grid_size, grid_coord.u, grid_coord.v);
            let element = grids.element(grid_coord);
            if let Some(displacement) = element.displacement {
                *displacement = ccg_grid.positions[index].into();
            }
            if let (Some(mask), Some(masks)) = (element.mask, &ccg_grid.masks) {
                *mask = masks[index];
            }
        });

        Ok(())
    }

    /// Moves every object space sample with a deform modifier. All samples
    /// are deformed in one call.
    pub fn deform_object_grids(&mut self, deform: &dyn DeformModifier) {
        let mut positions = self
            .layers
            .displacement
            .iter()
            .flat_map(|grid| grid.disps.iter().flatten())
            .map(|&sample| Vec3::from(sample))
            .collect::<Vec<_>>();

        deform.deform_positions(&mut positions);

        for (sample, position) in self
            .layers
            .displacement
            .iter_mut()
            .flat_map(|grid| grid.disps.iter_mut().flatten())
            .zip(positions)
        {
            *sample = position.into();
        }
    }
}
