//! Passes over every sample of every grid.
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::trace;

use super::addressing::{grid_element_index, FaceTopology, GridCoord};
use crate::{
    mesh::{DisplacementGrid, PaintMaskGrid},
    subdiv::grid_size_from_level,
};

/// Mutable view of the displacement and paint mask layers of a mesh.
#[derive(Debug)]
pub struct GridLayersMut<'a> {
    pub displacement: &'a mut [DisplacementGrid],
    pub paint_mask: Option<&'a mut [PaintMaskGrid]>,
}

/// Mutable access to a single sample of the live layers.
///
/// A field is `None` if the grid holds no data or holds it at another level
/// than the one looked up.
#[derive(Debug)]
pub struct GridElement<'g> {
    pub displacement: Option<&'g mut [f32; 3]>,
    pub mask: Option<&'g mut f32>,
}

impl<'g> GridElement<'g> {
    pub(crate) fn lookup(
        displacement: &'g mut DisplacementGrid,
        paint_mask: Option<&'g mut PaintMaskGrid>,
        level: usize,
        grid_coord: &GridCoord,
    ) -> Self {
        let index = grid_element_index(grid_size_from_level(level), grid_coord.u, grid_coord.v);
        let displacement = match displacement {
            DisplacementGrid {
                level: grid_level,
                disps: Some(disps),
            } if *grid_level == level => Some(&mut disps[index]),
            _ => None,
        };
        Self {
            displacement,
            mask: paint_mask
                .filter(|mask| mask.level == level)
                .and_then(|mask| mask.data.as_mut())
                .map(|data| &mut data[index]),
        }
    }
}

/// The grids of one base face, handed to a pass callback.
#[derive(Debug)]
pub struct FaceGrids<'f> {
    face: usize,
    first_grid: usize,
    level: usize,
    grid_size: usize,
    displacement: &'f mut [DisplacementGrid],
    paint_mask: Option<&'f mut [PaintMaskGrid]>,
}

impl FaceGrids<'_> {
    #[inline]
    pub fn face(&self) -> usize {
        self.face
    }

    #[inline]
    pub fn corners_len(&self) -> usize {
        self.displacement.len()
    }

    /// Returns the sample nearest to `grid_coord`, which must address a grid
    /// of this face.
    pub fn element(&mut self, grid_coord: &GridCoord) -> GridElement<'_> {
        let corner = grid_coord.grid_index - self.first_grid;
        GridElement::lookup(
            &mut self.displacement[corner],
            self.paint_mask.as_deref_mut().map(|mask| &mut mask[corner]),
            self.level,
            grid_coord,
        )
    }
}

fn visit_face<F>(face: &mut FaceGrids, callback: &F)
where
    F: Fn(&GridCoord, &mut FaceGrids) + Sync,
{
    let grid_size = face.grid_size;
    let step = if grid_size > 1 {
        1.0 / (grid_size - 1) as f32
    } else {
        0.0
    };

    for corner in 0..face.corners_len() {
        let grid_index = face.first_grid + corner;
        for y in 0..grid_size {
            let v = y as f32 * step;
            for x in 0..grid_size {
                let u = x as f32 * step;
                callback(&GridCoord { grid_index, u, v }, face);
            }
        }
    }
}

/// Calls `callback` for every sample of every grid at `level`.
///
/// Faces are processed in parallel; the callback only ever gets the grids
/// of the face the sample belongs to. Samples are looked up at the grid size
/// of `level`; grids stored at another level are left alone. Returns once
/// all faces are done.
pub fn foreach_grid_coordinate<F>(
    topology: &FaceTopology,
    layers: &mut GridLayersMut,
    level: usize,
    callback: F,
) where
    F: Fn(&GridCoord, &mut FaceGrids) + Sync,
{
    let grid_size = grid_size_from_level(level);
    trace!(level, faces = topology.faces_len(), grid_size, "grid pass");

    let mut displacement = &mut *layers.displacement;
    let mut paint_mask = layers.paint_mask.as_deref_mut();
    let mut faces = Vec::with_capacity(topology.faces_len());

    for face in 0..topology.faces_len() {
        let grids = topology.face_grids(face);
        let (face_displacement, rest) = std::mem::take(&mut displacement).split_at_mut(grids.len());
        displacement = rest;
        let face_paint_mask = match paint_mask.take() {
            Some(mask) => {
                let (face_mask, rest) = mask.split_at_mut(grids.len());
                paint_mask = Some(rest);
                Some(face_mask)
            }
            None => None,
        };
        faces.push(FaceGrids {
            face,
            first_grid: grids.start,
            level,
            grid_size,
            displacement: face_displacement,
            paint_mask: face_paint_mask,
        });
    }

    #[cfg(feature = "rayon")]
    faces
        .par_iter_mut()
        .with_min_len(1)
        .for_each(|face| visit_face(face, &callback));

    #[cfg(not(feature = "rayon"))]
    faces.iter_mut().for_each(|face| visit_face(face, &callback));
}
