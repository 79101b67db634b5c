//! Evaluation of object modifier stacks.
use derive_more::Display;
use tracing::trace;

use crate::{
    mesh::Mesh,
    object::{ModifierData, ModifierKind, Object},
};

/// Which modifiers are evaluated.
#[derive(Display, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EvaluationMode {
    #[default]
    #[display("viewport")]
    Viewport,
    #[display("render")]
    Render,
}

/// Evaluation context for objects.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Depsgraph {
    pub mode: EvaluationMode,
}

impl Depsgraph {
    pub fn new(mode: EvaluationMode) -> Self {
        Self { mode }
    }

    /// Returns a copy of the object's base mesh with every enabled deform
    /// modifier in front of `stop_before` applied. Custom data layers are not
    /// copied.
    pub fn evaluated_deform_mesh(&self, object: &Object, stop_before: usize) -> Mesh {
        self.deform_mesh(&object.name, &object.mesh, &object.modifiers, stop_before)
    }

    pub(crate) fn deform_mesh(
        &self,
        name: &str,
        base_mesh: &Mesh,
        modifiers: &[ModifierData],
        stop_before: usize,
    ) -> Mesh {
        let mut mesh = base_mesh.clone_topology();
        for modifier in modifiers
            .iter()
            .take(stop_before)
            .filter(|modifier| modifier.is_enabled(self.mode))
        {
            if let ModifierKind::Deform(deform) = &modifier.kind {
                trace!(object = name, modifier = %modifier.name, mode = %self.mode, "deform");
                deform.deform_positions(mesh.positions_mut());
            }
        }
        mesh
    }
}
