//! Tests for grid and ptex addressing.

use multires_reshape::reshape::{FaceTopology, GridCoord, PTexCoord};
use multires_reshape::subdiv::{Subdiv, SubdivSettings};

use test_utils::*;

fn topology(mesh: &multires_reshape::mesh::Mesh) -> FaceTopology {
    let subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), mesh).unwrap();
    FaceTopology::new(mesh, subdiv.face_ptex_offset())
}

#[test]
fn test_grid_count_quad_and_triangle() {
    let topology = topology(&quad_and_triangle());

    // One grid per corner.
    assert_eq!(topology.grids_len(), 7);
    // One ptex face for the quad, one per triangle corner.
    assert_eq!(topology.ptex_faces_len(), 4);
    assert_eq!(topology.face_grids(0), 0..4);
    assert_eq!(topology.face_grids(1), 4..7);
}

#[test]
fn test_grid_to_face_and_corner() {
    let topology = topology(&quad_and_triangle());

    let faces = (0..7).map(|g| topology.grid_to_face_index(g)).collect::<Vec<_>>();
    assert_eq!(faces, vec![0, 0, 0, 0, 1, 1, 1]);

    let corners = (0..7).map(|g| topology.grid_to_corner(g)).collect::<Vec<_>>();
    assert_eq!(corners, vec![0, 1, 2, 3, 0, 1, 2]);

    assert!(topology.is_quad_face(0));
    assert!(!topology.is_quad_face(1));
}

#[test]
fn test_grid_to_ptex_index() {
    let topology = topology(&quad_and_triangle());

    // All quad grids share ptex face 0.
    for grid in 0..4 {
        assert_eq!(topology.grid_to_ptex_index(grid), 0);
    }
    assert_eq!(topology.grid_to_ptex_index(4), 1);
    assert_eq!(topology.grid_to_ptex_index(5), 2);
    assert_eq!(topology.grid_to_ptex_index(6), 3);
}

#[test]
fn test_quad_grid_corner_is_face_vertex() {
    let topology = topology(&quad_and_triangle());

    let expected = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    for (grid_index, &(u, v)) in expected.iter().enumerate() {
        let ptex = topology.grid_coord_to_ptex(&GridCoord {
            grid_index,
            u: 1.0,
            v: 1.0,
        });
        assert_eq!(ptex.ptex_face_index, 0);
        assert_eq!((ptex.u, ptex.v), (u, v));
    }
}

#[test]
fn test_grid_origin_is_face_center() {
    let topology = topology(&quad_and_triangle());

    for grid_index in 0..4 {
        let ptex = topology.grid_coord_to_ptex(&GridCoord {
            grid_index,
            u: 0.0,
            v: 0.0,
        });
        assert_eq!((ptex.u, ptex.v), (0.5, 0.5));
    }

    // Triangle corners: the face center is the far corner of the ptex face.
    let ptex = topology.grid_coord_to_ptex(&GridCoord {
        grid_index: 5,
        u: 0.0,
        v: 0.0,
    });
    assert_eq!(ptex.ptex_face_index, 2);
    assert_eq!((ptex.u, ptex.v), (1.0, 1.0));
}

#[test]
fn test_grid_ptex_bijection() {
    let topology = topology(&pyramid());
    let samples = [0.125_f32, 0.25, 0.375, 0.625, 0.75, 0.875, 1.0];

    for grid_index in 0..topology.grids_len() {
        for &u in &samples {
            for &v in &samples {
                let grid_coord = GridCoord { grid_index, u, v };
                let ptex = topology.grid_coord_to_ptex(&grid_coord);
                let back = topology.ptex_coord_to_grid(&ptex);
                assert_eq!(back.grid_index, grid_index);
                assert!((back.u - u).abs() < 1e-6, "u {} -> {}", u, back.u);
                assert!((back.v - v).abs() < 1e-6, "v {} -> {}", v, back.v);
            }
        }
    }
}

#[test]
fn test_ptex_grid_bijection() {
    let topology = topology(&quad_and_triangle());
    let samples = [0.0_f32, 0.1, 0.3, 0.45, 0.55, 0.7, 0.9];

    for ptex_face_index in 0..topology.ptex_faces_len() {
        for &u in &samples {
            for &v in &samples {
                let ptex = PTexCoord {
                    ptex_face_index,
                    u,
                    v,
                };
                let back = topology.grid_coord_to_ptex(&topology.ptex_coord_to_grid(&ptex));
                assert_eq!(back.ptex_face_index, ptex_face_index);
                assert!((back.u - u).abs() < 1e-6);
                assert!((back.v - v).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn test_center_line_maps_to_one_grid() {
    let topology = topology(&quad_and_triangle());

    // On the quad's center line two grids meet; the inverse mapping picks
    // one of them and lands on its edge.
    let grid = topology.ptex_coord_to_grid(&PTexCoord {
        ptex_face_index: 0,
        u: 0.5,
        v: 0.25,
    });
    assert!(grid.grid_index == 0 || grid.grid_index == 1);
    assert!(grid.u == 0.0 || grid.v == 0.0);
}

#[test]
fn test_plane_topology() {
    let topology = topology(&plane(2));

    assert_eq!(topology.grids_len(), 16);
    assert_eq!(topology.ptex_faces_len(), 4);
    assert_eq!(topology.grid_to_ptex_index(13), 3);
}
