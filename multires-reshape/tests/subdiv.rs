//! Tests for the subdivision evaluator.

use multires_reshape::subdiv::*;
use multires_reshape::Error;
use ultraviolet::Vec3;

use test_utils::*;

const SAMPLES: [f32; 5] = [0.0, 0.2, 0.5, 0.7, 1.0];

#[test]
fn test_face_ptex_offset() {
    let subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &pyramid()).unwrap();
    assert_eq!(subdiv.face_ptex_offset(), &[0, 1, 4, 7, 10]);
    assert_eq!(subdiv.ptex_faces_len(), 13);

    let subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &quad_and_triangle()).unwrap();
    assert_eq!(subdiv.face_ptex_offset(), &[0, 1]);
    assert_eq!(subdiv.ptex_faces_len(), 4);
}

#[test]
fn test_eval_before_begin_fails() {
    let subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &plane(1)).unwrap();
    assert!(!subdiv.is_evaluator_ready());
    assert!(matches!(
        subdiv.eval_limit_point_and_derivatives(0, 0.5, 0.5),
        Err(Error::EvaluatorNotReady)
    ));
}

#[test]
fn test_eval_begin_with_other_topology_fails() {
    let mut subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &plane(2)).unwrap();
    assert!(matches!(
        subdiv.eval_begin_from_mesh(&plane(1), EvaluatorType::Cpu),
        Err(Error::TopologyMismatch {
            expected: 9,
            actual: 4
        })
    ));
    assert!(!subdiv.is_evaluator_ready());
}

#[cfg(feature = "topology_validation")]
#[test]
fn test_invalid_topology_is_rejected() {
    let result = multires_reshape::mesh::Mesh::new(vec![Vec3::zero(); 3], &[3], &[0, 1, 3]);
    assert!(matches!(result, Err(Error::InvalidTopology(_))));

    let result = multires_reshape::mesh::Mesh::new(vec![Vec3::zero(); 3], &[2], &[0, 1]);
    assert!(matches!(result, Err(Error::InvalidTopology(_))));
}

#[test]
fn test_refinement_level_zero_evaluates_as_one() {
    let mesh = pyramid();
    let settings = |refinement_level| SubdivSettings {
        refinement_level,
        ..Default::default()
    };
    assert_eq!(settings(0).isolation_level(), 1);

    let zero = evaluated_subdiv(&mesh, settings(0));
    let one = evaluated_subdiv(&mesh, settings(1));
    assert_eq!(
        zero.limit_evaluator().unwrap().patches_len(),
        one.limit_evaluator().unwrap().patches_len()
    );
    for ptex_face in 0..zero.ptex_faces_len() {
        for &u in &SAMPLES {
            for &v in &SAMPLES {
                let a = zero.eval_limit_point_and_derivatives(ptex_face, u, v).unwrap();
                let b = one.eval_limit_point_and_derivatives(ptex_face, u, v).unwrap();
                assert_eq!(a, b);
            }
        }
    }
}

#[test]
fn test_regular_limit_surface_is_exact() {
    // Uniform cubic B-splines reproduce `x²` up to a constant offset of `1/3`.
    let mut mesh = plane(6);
    for position in mesh.positions_mut() {
        position.z = position.x * position.x;
    }
    let subdiv = evaluated_subdiv(&mesh, SubdivSettings::default());

    // Ptex face 14 spans `2 <= x <= 3`.
    let sample = subdiv.eval_limit_point_and_derivatives(14, 1.0 / 32.0, 0.5).unwrap();
    let x = 2.0 + 1.0 / 32.0;
    assert!((sample.p.x - x).abs() < 1e-4, "{:?}", sample.p);
    assert!((sample.p.z - 4.45931).abs() < 1e-3, "{:?}", sample.p);

    // The slope is continuous across the sample rows of the refined mesh.
    let slope = |u: f32| subdiv.eval_limit_point_and_derivatives(14, u, 0.5).unwrap().dpdu.z;
    let before = slope(1.0 / 16.0 - 1e-4);
    let after = slope(1.0 / 16.0 + 1e-4);
    assert!((before - 4.125).abs() < 1e-2, "{}", before);
    assert!((after - 4.125).abs() < 1e-2, "{}", after);
    assert!((after - before).abs() < 1e-3);
}

#[test]
fn test_creases_sharpen_the_limit_surface() -> anyhow::Result<()> {
    let mut mesh = plane_with_bump();
    mesh.set_edge_creases(&[[1, 4], [4, 7]], &[10.0, 10.0])?;

    let creased = evaluated_subdiv(&mesh, SubdivSettings::default());
    let smooth = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            use_creases: false,
            ..Default::default()
        },
    );
    let uncreased = evaluated_subdiv(&plane_with_bump(), SubdivSettings::default());

    // Vertex 4 is the last corner of ptex face 0.
    let creased = creased.eval_limit_point_and_derivatives(0, 1.0, 1.0)?;
    let smooth = smooth.eval_limit_point_and_derivatives(0, 1.0, 1.0)?;
    let uncreased = uncreased.eval_limit_point_and_derivatives(0, 1.0, 1.0)?;
    assert!(creased.p.z > smooth.p.z + 0.1, "{} vs {}", creased.p.z, smooth.p.z);
    assert_vec3_near(smooth.p, uncreased.p, 1e-6);
    Ok(())
}

fn plane_with_bump() -> multires_reshape::mesh::Mesh {
    let mut mesh = plane(2);
    mesh.positions_mut()[4].z = 1.0;
    mesh
}

#[test]
fn test_flat_plane_stays_flat() {
    let mesh = plane(3);
    let subdiv = evaluated_subdiv(&mesh, SubdivSettings::default());

    for ptex_face in 0..subdiv.ptex_faces_len() {
        for &u in &SAMPLES {
            for &v in &SAMPLES {
                let sample = subdiv.eval_limit_point_and_derivatives(ptex_face, u, v).unwrap();
                assert!(sample.p.z.abs() < 1e-5);
                assert!(sample.dpdu.z.abs() < 1e-5);
                assert!(sample.dpdv.z.abs() < 1e-5);
                assert!(sample.dpdu.cross(sample.dpdv).z > 0.0);
                // The limit surface shrinks away from the boundary but stays
                // inside the cage.
                assert!((0.0..=3.0).contains(&sample.p.x));
                assert!((0.0..=3.0).contains(&sample.p.y));
            }
        }
    }
}

#[test]
fn test_bilinear_reproduces_cage() {
    let mesh = multires_reshape::mesh::Mesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        &[4],
        &[0, 1, 2, 3],
    )
    .unwrap();
    let subdiv = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            scheme: Scheme::Bilinear,
            refinement_level: 2,
            ..Default::default()
        },
    );

    let sample = subdiv.eval_limit_point_and_derivatives(0, 0.25, 0.5).unwrap();
    assert_vec3_near(sample.p, Vec3::new(0.25, 0.5, 0.125), 1e-6);
    assert_vec3_near(sample.dpdu, Vec3::new(1.0, 0.0, 0.5), 1e-5);
    assert_vec3_near(sample.dpdv, Vec3::new(0.0, 1.0, 0.25), 1e-5);

    let corner = subdiv.eval_limit_point_and_derivatives(0, 1.0, 1.0).unwrap();
    assert_vec3_near(corner.p, Vec3::new(1.0, 1.0, 1.0), 1e-6);
}

#[test]
fn test_bilinear_triangle_corner_patch() {
    let mesh = quad_and_triangle();
    let subdiv = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            scheme: Scheme::Bilinear,
            refinement_level: 1,
            ..Default::default()
        },
    );

    // Ptex face 2 is the second triangle corner: origin at vertex 4, `u`
    // towards the edge midpoint of 4-2, far corner at the centroid.
    let origin = subdiv.eval_limit_point_and_derivatives(2, 0.0, 0.0).unwrap();
    assert_vec3_near(origin.p, Vec3::new(2.0, 0.5, 0.0), 1e-6);

    let centroid = subdiv.eval_limit_point_and_derivatives(2, 1.0, 1.0).unwrap();
    assert_vec3_near(centroid.p, Vec3::new(4.0 / 3.0, 0.5, 0.0), 1e-6);

    let edge = subdiv.eval_limit_point_and_derivatives(2, 1.0, 0.0).unwrap();
    assert_vec3_near(edge.p, Vec3::new(1.5, 0.75, 0.0), 1e-6);
}

#[test]
fn test_cube_limit_surface() {
    let mesh = cube();
    let subdiv = evaluated_subdiv(&mesh, SubdivSettings::default());
    assert_eq!(subdiv.ptex_faces_len(), 6);

    for ptex_face in 0..6 {
        for &u in &SAMPLES {
            for &v in &SAMPLES {
                let sample = subdiv.eval_limit_point_and_derivatives(ptex_face, u, v).unwrap();
                let radius = sample.p.mag();
                assert!(radius > 0.5 && radius < 3.0_f32.sqrt(), "radius {}", radius);
                // Faces are wound counter-clockwise seen from outside.
                assert!(sample.dpdu.cross(sample.dpdv).dot(sample.p) > 0.0);
            }
        }
    }
}

#[test]
fn test_limit_at_face_center_is_independent_of_refinement() {
    let mesh = cube();
    let coarse = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            refinement_level: 2,
            ..Default::default()
        },
    );
    let fine = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            refinement_level: 5,
            ..Default::default()
        },
    );

    for ptex_face in 0..6 {
        let a = coarse.eval_limit_point_and_derivatives(ptex_face, 0.5, 0.5).unwrap();
        let b = fine.eval_limit_point_and_derivatives(ptex_face, 0.5, 0.5).unwrap();
        assert_vec3_near(a.p, b.p, 1e-4);
    }
}

#[test]
fn test_corner_interpolation_keeps_corners() {
    let mesh = plane(1);
    let subdiv = evaluated_subdiv(
        &mesh,
        SubdivSettings {
            boundary_interpolation: BoundaryInterpolation::EdgeAndCorner,
            ..Default::default()
        },
    );

    let corner = subdiv.eval_limit_point_and_derivatives(0, 0.0, 0.0).unwrap();
    assert_vec3_near(corner.p, Vec3::new(0.0, 0.0, 0.0), 1e-6);

    let smooth = evaluated_subdiv(&mesh, SubdivSettings::default());
    let corner = smooth.eval_limit_point_and_derivatives(0, 0.0, 0.0).unwrap();
    assert!(corner.p.x > 0.0 && corner.p.y > 0.0);
}

#[test]
fn test_uv_helpers() {
    assert_eq!(grid_size_from_level(0), 1);
    assert_eq!(grid_size_from_level(4), 17);
    assert_eq!(grid_uv_to_ptex_face_uv(0.25, 0.5), (0.5, 0.75));
    assert_eq!(rotate_quad_to_corner(0.75, 0.25), (1, 0.5, 0.5));
    assert_eq!(rotate_quad_to_corner(0.25, 0.75), (3, 0.5, 0.5));
}
