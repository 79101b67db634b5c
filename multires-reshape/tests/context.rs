//! Tests for reshape context construction and element access.

use multires_reshape::{
    ccg::SubdivCcg,
    depsgraph::Depsgraph,
    mesh::DisplacementGrid,
    object::{ModifierData, ModifierKind, MultiresModifier, Object, ObjectMode},
    reshape::{GridCoord, OrigGridElement, PTexCoord, ReshapeContext},
    subdiv::{Subdiv, SubdivSettings},
    Error,
};
use ultraviolet::Vec3;

use test_utils::*;

const CENTER: GridCoord = GridCoord {
    grid_index: 0,
    u: 0.5,
    v: 0.5,
};

#[test]
fn test_missing_displacement_layer() {
    let mut object = Object::new("Plane", plane(1));
    let multires = object.push_modifier(ModifierData::new(
        "Multires",
        ModifierKind::Multires(MultiresModifier::default()),
    ));

    assert!(matches!(
        ReshapeContext::create_from_modifier(&mut object, multires, 1),
        Err(Error::NoDisplacementLayer)
    ));
    assert!(object.mesh.corner_data.displacement.is_none());
}

#[test]
fn test_modifier_lookup_errors() {
    let (mut object, multires) = multires_object(plane(1), 1);
    let deform = object.push_modifier(ModifierData::new(
        "Translate",
        ModifierKind::Deform(Box::new(Translate(Vec3::unit_z()))),
    ));

    assert!(matches!(
        ReshapeContext::create_from_modifier(&mut object, deform, 1),
        Err(Error::NotMultires(index)) if index == deform
    ));
    assert!(matches!(
        ReshapeContext::create_from_modifier(&mut object, 5, 1),
        Err(Error::ModifierNotFound(5))
    ));
    assert!(ReshapeContext::create_from_modifier(&mut object, multires, 1).is_ok());
}

#[test]
fn test_subdiv_without_evaluator() {
    let (mut object, multires) = multires_object(plane(1), 1);
    let subdiv = Subdiv::new_from_mesh(SubdivSettings::default(), &object.mesh).unwrap();

    assert!(matches!(
        ReshapeContext::create_from_subdiv(&mut object, multires, &subdiv, 1),
        Err(Error::EvaluatorNotReady)
    ));
}

#[test]
fn test_subdiv_is_borrowed() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 1);
    let subdiv = evaluated_subdiv(&object.mesh, SubdivSettings::default());

    let reshape = ReshapeContext::create_from_subdiv(&mut object, multires, &subdiv, 2)?;
    assert!(std::ptr::eq(reshape.subdiv(), &subdiv));
    assert_eq!(reshape.reshape_level().level(), 1);
    assert_eq!(reshape.top_level().level(), 2);
    Ok(())
}

#[test]
fn test_grid_count_mismatch() {
    let (mut object, multires) = multires_object(plane(1), 1);
    object.mesh.corner_data.displacement = Some(vec![DisplacementGrid::default(); 2]);

    assert!(matches!(
        ReshapeContext::create_from_modifier(&mut object, multires, 1),
        Err(Error::GridCountMismatch {
            expected: 4,
            actual: 2
        })
    ));
}

#[test]
fn test_levels() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 1);

    let reshape = ReshapeContext::create_from_modifier(&mut object, multires, 3)?;
    assert_eq!(reshape.reshape_level().to_string(), "1 (3x3)");
    assert_eq!(reshape.top_level().to_string(), "3 (9x9)");
    assert_eq!(reshape.top_level().grid_size(), 9);
    Ok(())
}

#[test]
fn test_base_mesh_reshape_level_follows_mode() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 3);
    {
        let settings = object.multires_modifier_mut(multires)?;
        settings.levels = 1;
        settings.sculpt_levels = 2;
    }
    let depsgraph = Depsgraph::default();

    let reshape = ReshapeContext::create_from_base_mesh(&depsgraph, &mut object, multires)?;
    assert_eq!(reshape.reshape_level().level(), 1);
    assert_eq!(reshape.top_level().level(), 3);
    drop(reshape);

    object.mode = ObjectMode::Sculpt;
    let reshape = ReshapeContext::create_from_base_mesh(&depsgraph, &mut object, multires)?;
    assert_eq!(reshape.reshape_level().level(), 2);
    Ok(())
}

#[test]
fn test_ccg_reshape_level() -> anyhow::Result<()> {
    let mut mesh = plane(1);
    mesh.add_displacement_layer();
    let subdiv = evaluated_subdiv(&mesh, SubdivSettings::default());
    let ccg = SubdivCcg::from_limit_surface(subdiv, 2, &mesh)?;

    let reshape = ReshapeContext::create_from_ccg(&ccg, &mut mesh, 3)?;
    assert_eq!(reshape.reshape_level().level(), 2);
    assert_eq!(reshape.top_level().level(), 3);
    assert!(std::ptr::eq(reshape.subdiv(), &ccg.subdiv));
    Ok(())
}

#[test]
fn test_ccg_of_other_topology() -> anyhow::Result<()> {
    let other = plane(2);
    let subdiv = evaluated_subdiv(&other, SubdivSettings::default());
    let ccg = SubdivCcg::from_limit_surface(subdiv, 1, &other)?;

    let mut mesh = plane(1);
    mesh.add_displacement_layer();
    assert!(matches!(
        ReshapeContext::create_from_ccg(&ccg, &mut mesh, 1),
        Err(Error::TopologyMismatch {
            expected: 4,
            actual: 1
        })
    ));
    Ok(())
}

#[test]
fn test_ccg_with_other_face_arities() -> anyhow::Result<()> {
    // Same vertices and corners as `quad_and_triangle()`, faces swapped.
    let triangle_first = multires_reshape::mesh::Mesh::new(
        quad_and_triangle().positions().to_vec(),
        &[3, 4],
        &[1, 4, 2, 0, 1, 2, 3],
    )?;
    let subdiv = evaluated_subdiv(&triangle_first, SubdivSettings::default());
    let ccg = SubdivCcg::from_limit_surface(subdiv, 1, &triangle_first)?;

    let mut mesh = quad_and_triangle();
    mesh.add_displacement_layer();
    let before = mesh.clone();
    assert!(matches!(
        ReshapeContext::create_from_ccg(&ccg, &mut mesh, 1),
        Err(Error::TopologyMismatch {
            expected: 3,
            actual: 4
        })
    ));
    assert_eq!(mesh, before);
    Ok(())
}

/// Limit surface point at the center of grid 0 as seen by `create_from_object()`.
fn object_limit_at_center(object: &mut Object, multires: usize) -> anyhow::Result<Vec3> {
    let reshape = ReshapeContext::create_from_object(&Depsgraph::default(), object, multires)?;
    Ok(reshape.evaluate_limit_at_grid(&CENTER).0)
}

#[test]
fn test_object_limit_includes_deform_modifiers() -> anyhow::Result<()> {
    let mut mesh = plane(2);
    mesh.add_displacement_layer();
    let mut object = Object::new("Plane", mesh);
    let deform = object.push_modifier(ModifierData::new(
        "Translate",
        ModifierKind::Deform(Box::new(Translate(Vec3::unit_z()))),
    ));
    let multires = object.push_modifier(ModifierData::new(
        "Multires",
        ModifierKind::Multires(MultiresModifier {
            total_levels: 1,
            levels: 1,
            ..Default::default()
        }),
    ));

    let base = {
        let reshape = ReshapeContext::create_from_modifier(&mut object, multires, 1)?;
        reshape.evaluate_limit_at_grid(&CENTER).0
    };

    let deformed = object_limit_at_center(&mut object, multires)?;
    assert_vec3_near(deformed, base + Vec3::unit_z(), 1e-5);
    // The base mesh itself is not moved.
    assert_eq!(object.mesh.positions()[0], Vec3::zero());

    object.modifiers[deform].show_viewport = false;
    let hidden = object_limit_at_center(&mut object, multires)?;
    assert_vec3_near(hidden, base, 1e-6);
    Ok(())
}

#[test]
fn test_deform_modifiers_after_multires_are_ignored() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(2), 1);
    object.push_modifier(ModifierData::new(
        "Translate",
        ModifierKind::Deform(Box::new(Translate(Vec3::unit_z()))),
    ));

    let limit = object_limit_at_center(&mut object, multires)?;
    assert!(limit.z.abs() < 1e-5);

    let deformed = Depsgraph::default().evaluated_deform_mesh(&object, object.modifiers.len());
    assert_eq!(deformed.positions()[0], Vec3::unit_z());
    assert!(deformed.corner_data.displacement.is_none());
    Ok(())
}

#[test]
fn test_element_by_grid_and_ptex_coord() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 1);
    object.mesh.add_paint_mask_layer();

    {
        let mut reshape = ReshapeContext::create_from_modifier(&mut object, multires, 1)?;
        reshape.ensure_grids(1);

        let grid_coord = GridCoord {
            grid_index: 2,
            u: 1.0,
            v: 0.5,
        };
        let element = reshape.grid_element_for_grid_coord(&grid_coord);
        *element.displacement.unwrap() = [1.0, 2.0, 3.0];
        *element.mask.unwrap() = 0.5;

        // Ptex (0.75, 1) of the quad lies on the edge of corner 2's grid.
        let ptex_coord = reshape.grid_coord_to_ptex(&grid_coord);
        assert_eq!(
            ptex_coord,
            PTexCoord {
                ptex_face_index: 0,
                u: 0.75,
                v: 1.0
            }
        );
        let element = reshape.grid_element_for_ptex_coord(&ptex_coord);
        assert_eq!(*element.displacement.unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(*element.mask.unwrap(), 0.5);
    }

    let grids = object.mesh.corner_data.displacement.as_ref().unwrap();
    // Row 1, column 2 of a 3x3 grid.
    assert_eq!(grids[2].disps.as_ref().unwrap()[5], [1.0, 2.0, 3.0]);
    let masks = object.mesh.corner_data.paint_mask.as_ref().unwrap();
    assert_eq!(masks[2].data.as_ref().unwrap()[5], 0.5);
    Ok(())
}

#[test]
fn test_absent_grid_has_no_element() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 1);
    let mut reshape = ReshapeContext::create_from_modifier(&mut object, multires, 1)?;

    let element = reshape.grid_element_for_grid_coord(&CENTER);
    assert!(element.displacement.is_none());
    assert!(element.mask.is_none());
    Ok(())
}

#[test]
fn test_original_grids_snapshot() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(plane(1), 1);
    fill_displacement(&mut object.mesh, 1, |grid, x, y| [grid as f32, x as f32, y as f32]);
    // Grid 3 stays absent.
    object.mesh.corner_data.displacement.as_mut().unwrap()[3] = DisplacementGrid::default();
    let before = object.mesh.corner_data.displacement.clone().unwrap();

    let mut reshape = ReshapeContext::create_from_modifier(&mut object, multires, 1)?;
    assert!(reshape.original_grids().is_none());
    assert_eq!(reshape.orig_grid_element_for_grid_coord(&CENTER), OrigGridElement::default());

    reshape.store_original_grids();
    let orig = reshape.original_grids().unwrap();
    assert_eq!(orig.displacement, before);
    assert!(orig.displacement[3].disps.is_none());
    assert!(orig.paint_mask.is_none());

    // Writes to the live grids do not reach the snapshot.
    *reshape.grid_element_for_grid_coord(&CENTER).displacement.unwrap() = [9.0; 3];
    assert_eq!(
        reshape.orig_grid_element_for_grid_coord(&CENTER).displacement,
        [0.0, 1.0, 1.0]
    );

    let absent = GridCoord {
        grid_index: 3,
        ..CENTER
    };
    assert_eq!(reshape.orig_grid_element_for_grid_coord(&absent), OrigGridElement::default());

    reshape.free_original_grids();
    assert!(reshape.original_grids().is_none());
    assert_eq!(reshape.orig_grid_element_for_grid_coord(&CENTER), OrigGridElement::default());
    Ok(())
}

#[test]
fn test_topology_queries() -> anyhow::Result<()> {
    let (mut object, multires) = multires_object(quad_and_triangle(), 1);
    let reshape = ReshapeContext::create_from_modifier(&mut object, multires, 1)?;

    assert_eq!(reshape.grid_to_face_index(5), 1);
    assert_eq!(reshape.grid_to_corner(5), 1);
    assert_eq!(reshape.grid_to_ptex_index(5), 2);
    assert!(reshape.is_quad_face(0));
    assert!(!reshape.is_quad_face(1));

    let grid_coord = reshape.ptex_coord_to_grid(&PTexCoord {
        ptex_face_index: 3,
        u: 0.25,
        v: 0.5,
    });
    assert_eq!(
        grid_coord,
        GridCoord {
            grid_index: 6,
            u: 0.5,
            v: 0.75
        }
    );
    Ok(())
}
