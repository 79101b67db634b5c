//! Reshape operations composed from the context primitives.
//!
//! Each operation leaves the mesh untouched if the context cannot be
//! created.
use derive_more::Display;
use tracing::{debug, warn};
use ultraviolet::Vec3;

use super::{downsample_grids, ensure_grids, ReshapeContext};
use crate::{
    ccg::SubdivCcg,
    depsgraph::{Depsgraph, EvaluationMode},
    mesh::Mesh,
    object::{deform_modifier, Object},
    Error, Result,
};

/// How [`subdivide_to_level()`] fills the new levels.
#[derive(Display, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SubdivideMode {
    /// Follow the smooth limit surface. Existing detail is carried over
    /// sample by sample.
    #[default]
    #[display("catmull-clark")]
    CatmullClark,
    /// Keep the faces flat. Existing detail is interpolated linearly in
    /// object space.
    #[display("simple")]
    Simple,
    /// Keep the faces flat. Existing displacement is interpolated linearly
    /// in tangent space.
    #[display("linear")]
    Linear,
}

/// Bakes sculpted dense grids into tangent space displacement at
/// `top_level`.
pub fn reshape_from_ccg(top_level: usize, mesh: &mut Mesh, ccg: &SubdivCcg) -> Result<()> {
    let mut reshape = ReshapeContext::create_from_ccg(ccg, mesh, top_level)
        .inspect_err(|err| warn!(%err, "cannot reshape from ccg"))?;
    ccg.validate(reshape.topology().grids_len())
        .inspect_err(|err| warn!(%err, "cannot reshape from ccg"))?;

    reshape.store_original_grids();
    reshape.ensure_grids(top_level);
    reshape.assign_final_coords_from_ccg(ccg)?;
    reshape.object_grids_to_tangent_displacement();

    Ok(())
}

/// Applies a deform modifier to the displaced surface and stores the result
/// as displacement.
///
/// The limit surface is evaluated on the base mesh deformed by the modifiers
/// in front of the multires modifier, as for
/// [`ReshapeContext::create_from_object()`].
pub fn reshape_from_deform_modifier(
    depsgraph: &Depsgraph,
    object: &mut Object,
    multires_index: usize,
    deform_index: usize,
) -> Result<()> {
    let Object {
        name,
        mesh,
        mode,
        modifiers,
    } = object;
    let deform = deform_modifier(modifiers, deform_index)?;
    if deform_index <= multires_index {
        let err = Error::DeformBeforeMultires {
            deform: deform_index,
            multires: multires_index,
        };
        warn!(%err, object = %name, "cannot reshape from deform modifier");
        return Err(err);
    }
    let mut reshape =
        ReshapeContext::create_from_object_parts(depsgraph, name, mesh, *mode, modifiers, multires_index)
            .inspect_err(|err| warn!(%err, object = %name, "cannot reshape from deform modifier"))?;

    let top_level = reshape.top_level().level();
    reshape.ensure_grids(top_level);
    reshape.assign_final_coords_from_mdisps();
    reshape.deform_object_grids(deform);
    reshape.object_grids_to_tangent_displacement();

    Ok(())
}

/// Raises the level displacement is stored at to `top_level`.
///
/// Existing displacement is carried over to the finer grids as `mode`
/// says. Without existing displacement the new grids follow the limit
/// surface for [`SubdivideMode::CatmullClark`] and the flat faces of the
/// base mesh otherwise. Does nothing if the modifier is already at or above
/// `top_level`.
pub fn subdivide_to_level(
    object: &mut Object,
    multires_index: usize,
    top_level: usize,
    mode: SubdivideMode,
) -> Result<()> {
    let multires = *object.multires_modifier(multires_index)?;
    if top_level <= multires.total_levels {
        return Ok(());
    }

    if object.mesh.corners_len() > 0 {
        let had_displacement = !object.mesh.add_displacement_layer();
        if !had_displacement || top_level == 1 || multires.total_levels == 0 {
            ensure_grids(&mut object.mesh, top_level);
            if mode != SubdivideMode::CatmullClark {
                let mut reshape = ReshapeContext::create_from_modifier(object, multires_index, top_level)
                    .inspect_err(|err| warn!(%err, "cannot subdivide multires"))?;
                reshape.assign_final_coords_from_linear_cage()?;
                reshape.object_grids_to_tangent_displacement();
            }
        } else {
            let mut reshape = ReshapeContext::create_from_modifier(object, multires_index, top_level)
                .inspect_err(|err| warn!(%err, "cannot subdivide multires"))?;
            reshape.store_original_grids();
            reshape.ensure_grids(top_level);
            match mode {
                SubdivideMode::CatmullClark => reshape.assign_final_elements_from_orig_mdisps(),
                SubdivideMode::Simple => reshape.assign_final_coords_from_orig_object_space(),
                SubdivideMode::Linear => reshape.assign_final_elements_from_orig_mdisps_interpolated(),
            }
            // Without the snapshot every detail counts as added against the
            // base mesh limit surface.
            reshape.free_original_grids();
            reshape.object_grids_to_tangent_displacement();
        }
    }

    let object_mode = object.mode;
    object
        .multires_modifier_mut(multires_index)?
        .set_total_levels(top_level, object_mode);
    debug!(object = %object.name, %mode, from = multires.total_levels, to = top_level, "subdivided multires");

    Ok(())
}

/// Drops every level above the one currently shown in the object's mode.
///
/// Grids are resampled down to that level. At level `0` the displacement
/// and paint mask layers are removed.
pub fn delete_higher_levels(object: &mut Object, multires_index: usize) -> Result<()> {
    let multires = *object.multires_modifier(multires_index)?;
    let level = multires.level(object.mode, EvaluationMode::Viewport);
    if level >= multires.total_levels {
        return Ok(());
    }

    if level == 0 {
        object.mesh.free_displacement_layer();
        object.mesh.free_paint_mask_layer();
    } else {
        downsample_grids(&mut object.mesh, level);
    }

    let object_mode = object.mode;
    object
        .multires_modifier_mut(multires_index)?
        .set_total_levels(level, object_mode);
    debug!(object = %object.name, from = multires.total_levels, to = level, "deleted higher multires levels");

    Ok(())
}

/// Stores the positions of the base mesh subdivided to the multires level
/// shown in the object's mode as displacement.
///
/// `vertcos` is indexed the way [`foreach_subdiv_vertex()`](super::foreach_subdiv_vertex)
/// numbers vertices. The limit surface is evaluated as for
/// [`ReshapeContext::create_from_object()`]. Nothing is changed if the
/// number of positions does not match.
pub fn reshape_from_vertcos(
    depsgraph: &Depsgraph,
    object: &mut Object,
    multires_index: usize,
    vertcos: &[Vec3],
) -> Result<()> {
    let name = object.name.clone();
    let mut reshape = ReshapeContext::create_from_object(depsgraph, object, multires_index)
        .inspect_err(|err| warn!(%err, object = %name, "cannot reshape from vertices"))?;
    reshape
        .validate_vertcos(vertcos)
        .inspect_err(|err| warn!(%err, object = %name, "cannot reshape from vertices"))?;

    let top_level = reshape.top_level().level();
    reshape.ensure_grids(top_level);
    reshape.assign_final_coords_from_mdisps();
    reshape.assign_final_coords_from_vertcos(vertcos)?;
    reshape.object_grids_to_tangent_displacement();

    Ok(())
}

/// Stores the shape of `source` as displacement of `object`.
///
/// `source` is evaluated with all its enabled deform modifiers and must have
/// the topology of `object`'s base mesh subdivided to the shown multires
/// level.
pub fn reshape_from_object(
    depsgraph: &Depsgraph,
    object: &mut Object,
    multires_index: usize,
    source: &Object,
) -> Result<()> {
    let source_mesh = depsgraph.evaluated_deform_mesh(source, source.modifiers.len());
    debug!(object = %object.name, source = %source.name, "reshaping from object");
    reshape_from_vertcos(depsgraph, object, multires_index, source_mesh.positions())
}
