//! Index math between faces, grids and ptex faces.
use std::ops::Range;

use crate::{
    mesh::Mesh,
    subdiv::{grid_uv_to_ptex_face_uv, ptex_face_uv_to_grid_uv, rotate_grid_to_quad, rotate_quad_to_corner},
};

/// A sample location inside a displacement grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridCoord {
    pub grid_index: usize,
    pub u: f32,
    pub v: f32,
}

/// A sample location inside a ptex face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PTexCoord {
    pub ptex_face_index: usize,
    pub u: f32,
    pub v: f32,
}

/// Lookup tables between base faces, their grids and their ptex faces.
///
/// Every face corner owns one grid; grids are numbered face by face. A quad
/// is a single ptex face, every other face has one ptex face per corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceTopology {
    face_start_grid_index: Vec<usize>,
    grid_to_face_index: Vec<usize>,
    ptex_start_grid_index: Vec<usize>,
    face_ptex_offset: Vec<usize>,
}

impl FaceTopology {
    /// Builds the tables for `mesh`.
    ///
    /// `face_ptex_offset` is the first ptex face of every face as numbered by
    /// the evaluator.
    pub fn new(mesh: &Mesh, face_ptex_offset: &[usize]) -> Self {
        debug_assert_eq!(mesh.faces_len(), face_ptex_offset.len());

        let ptex_faces_len = (0..mesh.faces_len())
            .map(|face| match mesh.face_corners(face).len() {
                4 => 1,
                corners => corners,
            })
            .sum();

        let mut face_start_grid_index = Vec::with_capacity(mesh.faces_len() + 1);
        let mut grid_to_face_index = Vec::with_capacity(mesh.corners_len());
        let mut ptex_start_grid_index = vec![0; ptex_faces_len];

        let mut grid_index = 0;
        for face in 0..mesh.faces_len() {
            let corners = mesh.face_corners(face).len();
            let face_ptex_faces = if corners == 4 { 1 } else { corners };

            face_start_grid_index.push(grid_index);
            grid_to_face_index.extend(std::iter::repeat(face).take(corners));
            for i in 0..face_ptex_faces {
                ptex_start_grid_index[face_ptex_offset[face] + i] = grid_index + i;
            }
            grid_index += corners;
        }
        face_start_grid_index.push(grid_index);

        Self {
            face_start_grid_index,
            grid_to_face_index,
            ptex_start_grid_index,
            face_ptex_offset: face_ptex_offset.to_vec(),
        }
    }

    #[inline]
    pub fn faces_len(&self) -> usize {
        self.face_start_grid_index.len() - 1
    }

    #[inline]
    pub fn grids_len(&self) -> usize {
        self.grid_to_face_index.len()
    }

    #[inline]
    pub fn ptex_faces_len(&self) -> usize {
        self.ptex_start_grid_index.len()
    }

    /// Grid indices owned by `face`.
    #[inline]
    pub fn face_grids(&self, face: usize) -> Range<usize> {
        self.face_start_grid_index[face]..self.face_start_grid_index[face + 1]
    }

    #[inline]
    pub fn is_quad_face(&self, face: usize) -> bool {
        self.face_grids(face).len() == 4
    }

    #[inline]
    pub fn grid_to_face_index(&self, grid_index: usize) -> usize {
        debug_assert!(
            grid_index < self.grids_len(),
            "grid index {} out of range (should be < {})",
            grid_index,
            self.grids_len()
        );
        self.grid_to_face_index[grid_index]
    }

    /// Corner of its face the grid belongs to.
    #[inline]
    pub fn grid_to_corner(&self, grid_index: usize) -> usize {
        grid_index - self.face_start_grid_index[self.grid_to_face_index(grid_index)]
    }

    pub fn grid_to_ptex_index(&self, grid_index: usize) -> usize {
        let face = self.grid_to_face_index(grid_index);
        let corner = self.grid_to_corner(grid_index);
        self.face_ptex_offset[face] + if self.is_quad_face(face) { 0 } else { corner }
    }

    pub fn grid_coord_to_ptex(&self, grid_coord: &GridCoord) -> PTexCoord {
        let face = self.grid_to_face_index(grid_coord.grid_index);
        let corner = self.grid_to_corner(grid_coord.grid_index);

        let (mut u, mut v) = grid_uv_to_ptex_face_uv(grid_coord.u, grid_coord.v);
        if self.is_quad_face(face) {
            let (grid_u, grid_v) = ptex_face_uv_to_grid_uv(u, v);
            (u, v) = rotate_grid_to_quad(corner, grid_u, grid_v);
        }

        PTexCoord {
            ptex_face_index: self.grid_to_ptex_index(grid_coord.grid_index),
            u,
            v,
        }
    }

    /// Inverse of [`grid_coord_to_ptex()`](Self::grid_coord_to_ptex).
    ///
    /// Points on the center lines of a quad are shared by two grids; either
    /// one may be returned.
    pub fn ptex_coord_to_grid(&self, ptex_coord: &PTexCoord) -> GridCoord {
        let start_grid_index = self.ptex_start_grid_index[ptex_coord.ptex_face_index];
        let face = self.grid_to_face_index(start_grid_index);

        let (corner_delta, u, v) = if self.is_quad_face(face) {
            rotate_quad_to_corner(ptex_coord.u, ptex_coord.v)
        } else {
            (0, ptex_coord.u, ptex_coord.v)
        };
        let (u, v) = ptex_face_uv_to_grid_uv(u, v);

        GridCoord {
            grid_index: start_grid_index + corner_delta,
            u,
            v,
        }
    }
}

/// Index of the sample nearest to `(u, v)` in a grid of `grid_size²`
/// samples.
#[inline]
pub(crate) fn grid_element_index(grid_size: usize, u: f32, v: f32) -> usize {
    let last = (grid_size - 1) as f32;
    let x = (u * last).round() as usize;
    let y = (v * last).round() as usize;
    y * grid_size + x
}

/// The samples around `(u, v)` in a grid of `grid_size²` samples with
/// their bilinear weights, as `(index, u, v, weight)` where `u` and `v` are
/// the sample's own coordinates.
pub(crate) fn bilinear_samples(grid_size: usize, u: f32, v: f32) -> [(usize, f32, f32, f32); 4] {
    let last = grid_size - 1;
    let axis = |t: f32| {
        let t = t.clamp(0.0, 1.0) * last as f32;
        let i0 = (t.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        (i0, i1, t - i0 as f32)
    };
    let to_uv = |i: usize| if last == 0 { 0.0 } else { i as f32 / last as f32 };

    let (x0, x1, fx) = axis(u);
    let (y0, y1, fy) = axis(v);
    [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x1, y0, fx * (1.0 - fy)),
        (x0, y1, (1.0 - fx) * fy),
        (x1, y1, fx * fy),
    ]
    .map(|(x, y, weight)| (y * grid_size + x, to_uv(x), to_uv(y), weight))
}
