//! Conversions between displacement grid and ptex face parameterizations.
//!
//! A quad base face is a single ptex face which is split into four grids,
//! one per corner. Every corner of a non-quad face is a ptex face of its own,
//! covered by exactly one grid.
//!
//! Grid coordinates have their origin at the face center and `(1, 1)` at the
//! corner vertex. Ptex coordinates of a corner sub-face have their origin at
//! the corner vertex.

/// Returns the number of samples along one side of a grid at the given
/// subdivision level.
///
/// Level 0 is a single sample at the face center.
///
/// ```
/// use multires_reshape::subdiv::grid_size_from_level;
///
/// assert_eq!(grid_size_from_level(0), 1);
/// assert_eq!(grid_size_from_level(2), 5);
/// ```
#[inline]
pub fn grid_size_from_level(level: usize) -> usize {
    match level {
        0 => 1,
        _ => (1 << level) + 1,
    }
}

/// Converts grid `(u, v)` to ptex face `(u, v)` of a corner sub-face.
#[inline]
pub fn grid_uv_to_ptex_face_uv(grid_u: f32, grid_v: f32) -> (f32, f32) {
    (1.0 - grid_v, 1.0 - grid_u)
}

/// Converts ptex face `(u, v)` of a corner sub-face to grid `(u, v)`.
#[inline]
pub fn ptex_face_uv_to_grid_uv(ptex_u: f32, ptex_v: f32) -> (f32, f32) {
    (1.0 - ptex_v, 1.0 - ptex_u)
}

/// Maps grid `(u, v)` of the given quad corner into the `(u, v)` space of
/// the whole quad ptex face.
#[inline]
pub fn rotate_grid_to_quad(corner: usize, grid_u: f32, grid_v: f32) -> (f32, f32) {
    match corner {
        0 => (0.5 - grid_v * 0.5, 0.5 - grid_u * 0.5),
        1 => (0.5 + grid_u * 0.5, 0.5 - grid_v * 0.5),
        2 => (0.5 + grid_v * 0.5, 0.5 + grid_u * 0.5),
        _ => (0.5 - grid_u * 0.5, 0.5 + grid_v * 0.5),
    }
}

/// Finds the quad corner whose quadrant contains the quad ptex `(u, v)` and
/// returns it together with the ptex `(u, v)` of that corner's sub-face.
///
/// Points on the center lines of the quad belong to more than one corner.
/// A coordinate of exactly `0.5` counts as the lower half.
#[inline]
pub fn rotate_quad_to_corner(quad_u: f32, quad_v: f32) -> (usize, f32, f32) {
    if quad_u <= 0.5 && quad_v <= 0.5 {
        (0, 2.0 * quad_u, 2.0 * quad_v)
    } else if quad_u > 0.5 && quad_v <= 0.5 {
        (1, 2.0 * quad_v, 2.0 * (1.0 - quad_u))
    } else if quad_u > 0.5 && quad_v > 0.5 {
        (2, 2.0 * (1.0 - quad_u), 2.0 * (1.0 - quad_v))
    } else {
        (3, 2.0 * (1.0 - quad_v), 2.0 * quad_u)
    }
}
