//! Vertices of the base mesh subdivided to a multires level and the grid
//! samples they land on.
//!
//! Vertices are numbered the way a subdivided mesh is built: base vertices
//! first, then the inner vertices of every base edge in edge order, then the
//! inner vertices of every face.
use tracing::debug;
use ultraviolet::Vec3;

use super::{GridCoord, GridElement, GridLayersMut, PTexCoord, ReshapeContext};
use crate::{
    mesh::{Mesh, MeshEdges},
    subdiv::grid_size_from_level,
    Error, Result,
};

/// Ptex `(u, v)` of the vertices of a quad, in corner order.
const QUAD_CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

/// Vertices along a base edge, both ends included.
#[inline]
fn edge_resolution(level: usize) -> usize {
    2 * (grid_size_from_level(level) - 1) + 1
}

fn inner_vertices_len(corners: usize, resolution: usize) -> usize {
    if corners == 4 {
        (resolution - 2).pow(2)
    } else {
        let ptex_resolution = resolution / 2 + 1;
        1 + corners * (ptex_resolution - 2) * (ptex_resolution - 1)
    }
}

/// Returns the number of vertices of `mesh` subdivided to `level`.
///
/// ```
/// # use multires_reshape::{mesh::Mesh, reshape::subdiv_vertices_len};
/// # use ultraviolet::Vec3;
/// let quad = Mesh::new(vec![Vec3::zero(); 4], &[4], &[0, 1, 2, 3])?;
/// assert_eq!(subdiv_vertices_len(&quad, 0), 4);
/// assert_eq!(subdiv_vertices_len(&quad, 1), 5 * 5);
/// assert_eq!(subdiv_vertices_len(&quad, 2), 9 * 9);
/// # Ok::<(), multires_reshape::Error>(())
/// ```
pub fn subdiv_vertices_len(mesh: &Mesh, level: usize) -> usize {
    if level == 0 {
        return mesh.vertices_len();
    }
    let resolution = edge_resolution(level);
    mesh.vertices_len()
        + mesh.edges().edges.len() * (resolution - 2)
        + (0..mesh.faces_len())
            .map(|face| inner_vertices_len(mesh.face_corners(face).len(), resolution))
            .sum::<usize>()
}

/// Calls `callback` with the index and the ptex coordinate of every vertex
/// of `mesh` subdivided to `level`.
///
/// Vertices on base vertices and base edges are visited once for every face
/// they lie on, each time with the ptex coordinate of that face.
/// `face_ptex_offset` is the first ptex face of every face. `level` must be
/// at least `1`.
pub fn foreach_subdiv_vertex<F>(mesh: &Mesh, face_ptex_offset: &[usize], level: usize, mut callback: F)
where
    F: FnMut(usize, &PTexCoord),
{
    debug_assert!(level > 0, "the base mesh has no subdivided vertices");
    let resolution = edge_resolution(level);
    let ptex_resolution = resolution / 2 + 1;
    let step = 1.0 / (resolution - 1) as f32;
    let ptex_step = 1.0 / (ptex_resolution - 1) as f32;
    let edge_vertices_len = resolution - 2;

    let MeshEdges { edges, corner_edges } = mesh.edges();
    let first_edge_vertex = mesh.vertices_len();
    let mut first_inner_vertex = first_edge_vertex + edges.len() * edge_vertices_len;

    for face in 0..mesh.faces_len() {
        let vertices = mesh.face_vertices(face);
        let corners = vertices.len();
        let first_corner = mesh.face_corners(face).start;
        let ptex = face_ptex_offset[face];
        let is_quad = corners == 4;
        let coord = |ptex_face_index, u, v| PTexCoord {
            ptex_face_index,
            u,
            v,
        };

        for (corner, &vertex) in vertices.iter().enumerate() {
            let ptex_coord = if is_quad {
                let (u, v) = QUAD_CORNERS[corner];
                coord(ptex, u, v)
            } else {
                coord(ptex + corner, 0.0, 0.0)
            };
            callback(vertex as usize, &ptex_coord);
        }

        for (corner, &vertex) in vertices.iter().enumerate() {
            let edge = corner_edges[first_corner + corner];
            let first = first_edge_vertex + edge * edge_vertices_len;
            let reversed = edges[edge][0] != vertex;
            let next_corner = (corner + 1) % corners;
            for i in 1..resolution - 1 {
                let index = first + if reversed { resolution - 2 - i } else { i - 1 };
                let ptex_coord = if is_quad {
                    let t = i as f32 * step;
                    let (u0, v0) = QUAD_CORNERS[corner];
                    let (u1, v1) = QUAD_CORNERS[next_corner];
                    coord(ptex, u0 + (u1 - u0) * t, v0 + (v1 - v0) * t)
                } else if i < ptex_resolution {
                    coord(ptex + corner, i as f32 * ptex_step, 0.0)
                } else {
                    coord(ptex + next_corner, 0.0, (resolution - 1 - i) as f32 * ptex_step)
                };
                callback(index, &ptex_coord);
            }
        }

        let mut index = first_inner_vertex;
        if is_quad {
            for y in 1..resolution - 1 {
                for x in 1..resolution - 1 {
                    callback(index, &coord(ptex, x as f32 * step, y as f32 * step));
                    index += 1;
                }
            }
        } else {
            callback(index, &coord(ptex, 1.0, 1.0));
            index += 1;
            for corner in 0..corners {
                for y in 1..ptex_resolution - 1 {
                    for x in 1..ptex_resolution {
                        callback(index, &coord(ptex + corner, x as f32 * ptex_step, y as f32 * ptex_step));
                        index += 1;
                    }
                }
            }
        }
        first_inner_vertex = index;
    }
}

fn assign_position(layers: &mut GridLayersMut, level: usize, grid_coord: &GridCoord, position: Vec3) {
    if let Some(displacement) = GridElement::lookup(
        &mut layers.displacement[grid_coord.grid_index],
        None,
        level,
        grid_coord,
    )
    .displacement
    {
        *displacement = position.into();
    }
}

impl ReshapeContext<'_> {
    /// Checks that `vertcos` has one position per vertex of the base mesh
    /// subdivided to the reshape level.
    pub fn validate_vertcos(&self, vertcos: &[Vec3]) -> Result<()> {
        let level = self.reshape.level();
        if level == 0 {
            return Err(Error::ReshapeLevelZero);
        }
        let expected = subdiv_vertices_len(&self.cage, level);
        if vertcos.len() != expected {
            return Err(Error::VertexCountMismatch {
                expected,
                actual: vertcos.len(),
            });
        }
        Ok(())
    }

    /// Writes the positions of the subdivided mesh at the reshape level as
    /// object space coordinates into the grids.
    ///
    /// Vertices on the boundary of a grid are written into every grid that
    /// shares them. With a top level above the reshape level only the
    /// matching top level samples are written.
    pub fn assign_final_coords_from_vertcos(&mut self, vertcos: &[Vec3]) -> Result<()> {
        self.validate_vertcos(vertcos)?;

        let level = self.reshape.level();
        let top_level = self.top.level;
        let topology = &self.topology;
        let layers = &mut self.layers;
        foreach_subdiv_vertex(&self.cage, self.subdiv.face_ptex_offset(), level, |index, ptex_coord| {
            let position = vertcos[index];
            let grid_coord = topology.ptex_coord_to_grid(ptex_coord);
            let face_grids = topology.face_grids(topology.grid_to_face_index(grid_coord.grid_index));
            let corners = face_grids.len();
            let corner = grid_coord.grid_index - face_grids.start;

            if grid_coord.u == 0.0 && grid_coord.v == 0.0 {
                for grid_index in face_grids {
                    assign_position(layers, top_level, &GridCoord { grid_index, ..grid_coord }, position);
                }
                return;
            }

            assign_position(layers, top_level, &grid_coord, position);
            if grid_coord.u == 0.0 {
                let previous = GridCoord {
                    grid_index: face_grids.start + (corner + corners - 1) % corners,
                    u: grid_coord.v,
                    v: 0.0,
                };
                assign_position(layers, top_level, &previous, position);
            }
            if grid_coord.v == 0.0 {
                let next = GridCoord {
                    grid_index: face_grids.start + (corner + 1) % corners,
                    u: 0.0,
                    v: grid_coord.u,
                };
                assign_position(layers, top_level, &next, position);
            }
        });
        debug!(level, vertices = vertcos.len(), "assigned coordinates from vertices");

        Ok(())
    }
}
