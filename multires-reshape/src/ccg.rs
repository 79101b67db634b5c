//! Dense grids of a subdivided surface, as used while sculpting.
use tracing::debug;
use ultraviolet::Vec3;

use crate::{
    mesh::Mesh,
    reshape::{FaceTopology, GridCoord},
    subdiv::{grid_size_from_level, Subdiv},
    Error, Result,
};

/// Object space positions (and optionally paint masks) of one grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CcgGrid {
    pub positions: Vec<Vec3>,
    pub masks: Option<Vec<f32>>,
}

/// A subdivision surface together with dense grids at one level, one grid
/// per base mesh corner.
#[derive(Debug)]
pub struct SubdivCcg {
    pub subdiv: Subdiv,
    pub level: usize,
    pub grids: Vec<CcgGrid>,
}

impl SubdivCcg {
    /// Creates zero-filled grids.
    pub fn new(subdiv: Subdiv, level: usize, grids_len: usize) -> Self {
        let grid_size = grid_size_from_level(level);
        Self {
            subdiv,
            level,
            grids: vec![
                CcgGrid {
                    positions: vec![Vec3::zero(); grid_size * grid_size],
                    masks: None,
                };
                grids_len
            ],
        }
    }

    /// Creates grids sampling the limit surface of `mesh`, without any
    /// displacement.
    ///
    /// `subdiv` must have been created from `mesh` and be ready for
    /// evaluation.
    pub fn from_limit_surface(subdiv: Subdiv, level: usize, mesh: &Mesh) -> Result<Self> {
        let topology = FaceTopology::new(mesh, subdiv.face_ptex_offset());
        let mut ccg = Self::new(subdiv, level, topology.grids_len());
        let grid_size = ccg.grid_size();
        let step = if grid_size > 1 {
            1.0 / (grid_size - 1) as f32
        } else {
            0.0
        };

        for (grid_index, grid) in ccg.grids.iter_mut().enumerate() {
            for y in 0..grid_size {
                for x in 0..grid_size {
                    let ptex_coord = topology.grid_coord_to_ptex(&GridCoord {
                        grid_index,
                        u: x as f32 * step,
                        v: y as f32 * step,
                    });
                    grid.positions[y * grid_size + x] = ccg
                        .subdiv
                        .eval_limit_point_and_derivatives(
                            ptex_coord.ptex_face_index,
                            ptex_coord.u,
                            ptex_coord.v,
                        )?
                        .p;
                }
            }
        }

        debug!(level, grids = ccg.grids.len(), "sampled limit surface grids");
        Ok(ccg)
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        grid_size_from_level(self.level)
    }

    /// Adds zero-filled paint masks to grids that have none.
    pub fn add_masks(&mut self) {
        let samples = self.grid_size() * self.grid_size();
        for grid in self.grids.iter_mut().filter(|grid| grid.masks.is_none()) {
            grid.masks = Some(vec![0.0; samples]);
        }
    }

    /// Checks that there is one grid per base mesh grid and every grid has
    /// `grid_size²` samples.
    pub fn validate(&self, grids_len: usize) -> Result<()> {
        if self.grids.len() != grids_len {
            return Err(Error::CcgMismatch {
                expected: grids_len,
                actual: self.grids.len(),
            });
        }
        let samples = self.grid_size() * self.grid_size();
        for grid in &self.grids {
            let masks_len = grid.masks.as_ref().map_or(samples, Vec::len);
            if let Some(actual) = [grid.positions.len(), masks_len]
                .into_iter()
                .find(|&len| len != samples)
            {
                return Err(Error::CcgMismatch {
                    expected: samples,
                    actual,
                });
            }
        }
        Ok(())
    }
}
