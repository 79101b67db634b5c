//! Objects and their modifier stacks.
use std::fmt::Debug;

use derive_more::Display;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use ultraviolet::Vec3;

use crate::{depsgraph::EvaluationMode, mesh::Mesh, Error, Result};

/// Interaction mode of an object.
#[derive(Display, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ObjectMode {
    #[default]
    #[display("object")]
    Object,
    #[display("edit")]
    Edit,
    #[display("sculpt")]
    Sculpt,
}

/// How UVs are smoothed by a multires modifier.
#[repr(u8)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum UvSmooth {
    None = 0,
    PreserveCorners = 1,
    PreserveCornersAndJunctions = 2,
    PreserveCornersJunctionsAndConcave = 3,
    PreserveBoundaries = 4,
    All = 5,
}

/// How mesh boundaries are smoothed by a multires modifier.
#[repr(u8)]
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundarySmooth {
    All = 0,
    PreserveCorners = 1,
}

/// Settings of a multires modifier.
///
/// Level fields count subdivision steps above the base mesh. `total_levels`
/// is the level displacement grids are stored at; the other levels are at
/// most `total_levels`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MultiresModifier {
    /// Level shown in the viewport.
    pub levels: usize,
    /// Level used in sculpt mode.
    pub sculpt_levels: usize,
    /// Level used for final renders.
    pub render_levels: usize,
    pub total_levels: usize,
    /// Refinement level of the limit surface evaluator.
    pub quality: usize,
    pub uv_smooth: UvSmooth,
    pub boundary_smooth: BoundarySmooth,
    pub use_creases: bool,
}

impl Default for MultiresModifier {
    /// Create multires settings with the following defaults:
    ///
    /// | Property          | Value                                                  |
    /// |-------------------|--------------------------------------------------------|
    /// | `levels`          | `0`                                                    |
    /// | `sculpt_levels`   | `0`                                                    |
    /// | `render_levels`   | `0`                                                    |
    /// | `total_levels`    | `0`                                                    |
    /// | `quality`         | `4`                                                    |
    /// | `uv_smooth`       | [`PreserveBoundaries`](UvSmooth::PreserveBoundaries)   |
    /// | `boundary_smooth` | [`All`](BoundarySmooth::All)                           |
    /// | `use_creases`     | `true`                                                 |
    fn default() -> Self {
        Self {
            levels: 0,
            sculpt_levels: 0,
            render_levels: 0,
            total_levels: 0,
            quality: 4,
            uv_smooth: UvSmooth::PreserveBoundaries,
            boundary_smooth: BoundarySmooth::All,
            use_creases: true,
        }
    }
}

impl MultiresModifier {
    /// The level that is displayed for an object in `mode`.
    pub fn level(&self, mode: ObjectMode, evaluation: EvaluationMode) -> usize {
        match (evaluation, mode) {
            (EvaluationMode::Render, _) => self.render_levels,
            (EvaluationMode::Viewport, ObjectMode::Sculpt) => self.sculpt_levels,
            (EvaluationMode::Viewport, _) => self.levels,
        }
    }

    /// Sets the total level and shows it everywhere. The viewport level of an
    /// object in sculpt mode is only clamped.
    pub fn set_total_levels(&mut self, total_levels: usize, mode: ObjectMode) {
        self.total_levels = total_levels;
        self.levels = if mode == ObjectMode::Sculpt {
            self.levels.min(total_levels)
        } else {
            total_levels
        };
        self.sculpt_levels = total_levels;
        self.render_levels = total_levels;
    }
}

/// A modifier that moves vertices without changing topology.
pub trait DeformModifier: Debug + Send + Sync {
    fn deform_positions(&self, positions: &mut [Vec3]);
}

#[derive(Debug)]
pub enum ModifierKind {
    Deform(Box<dyn DeformModifier>),
    Multires(MultiresModifier),
}

/// An entry of an object's modifier stack.
#[derive(Debug)]
pub struct ModifierData {
    pub name: String,
    pub show_viewport: bool,
    pub show_render: bool,
    pub kind: ModifierKind,
}

impl ModifierData {
    /// Creates a modifier that is enabled for viewport and render.
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            show_viewport: true,
            show_render: true,
            kind,
        }
    }

    /// Returns `true` if the modifier is evaluated in the given mode.
    #[inline]
    pub fn is_enabled(&self, mode: EvaluationMode) -> bool {
        match mode {
            EvaluationMode::Viewport => self.show_viewport,
            EvaluationMode::Render => self.show_render,
        }
    }
}

/// A mesh object with a modifier stack.
#[derive(Debug)]
pub struct Object {
    pub name: String,
    pub mesh: Mesh,
    pub mode: ObjectMode,
    pub modifiers: Vec<ModifierData>,
}

impl Object {
    /// Creates an object in object mode with an empty modifier stack.
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            mode: ObjectMode::Object,
            modifiers: Vec::new(),
        }
    }

    /// Appends a modifier and returns its stack index.
    pub fn push_modifier(&mut self, modifier: ModifierData) -> usize {
        self.modifiers.push(modifier);
        self.modifiers.len() - 1
    }

    pub fn multires_modifier(&self, index: usize) -> Result<&MultiresModifier> {
        multires_modifier(&self.modifiers, index)
    }

    pub fn multires_modifier_mut(&mut self, index: usize) -> Result<&mut MultiresModifier> {
        match &mut self.modifiers.get_mut(index).ok_or(Error::ModifierNotFound(index))?.kind {
            ModifierKind::Multires(multires) => Ok(multires),
            ModifierKind::Deform(_) => Err(Error::NotMultires(index)),
        }
    }

    pub fn deform_modifier(&self, index: usize) -> Result<&dyn DeformModifier> {
        deform_modifier(&self.modifiers, index)
    }
}

pub(crate) fn multires_modifier(modifiers: &[ModifierData], index: usize) -> Result<&MultiresModifier> {
    match &modifiers.get(index).ok_or(Error::ModifierNotFound(index))?.kind {
        ModifierKind::Multires(multires) => Ok(multires),
        ModifierKind::Deform(_) => Err(Error::NotMultires(index)),
    }
}

pub(crate) fn deform_modifier(modifiers: &[ModifierData], index: usize) -> Result<&dyn DeformModifier> {
    match &modifiers.get(index).ok_or(Error::ModifierNotFound(index))?.kind {
        ModifierKind::Deform(deform) => Ok(&**deform),
        ModifierKind::Multires(_) => Err(Error::NotDeform(index)),
    }
}
