use serde::Serialize;

use crate::domain::tree::mutation::{Affordance, DropTarget, MoveError};
use crate::domain::value_objects::MenuItemId;

/// What releasing the pointer right now would do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "preview", rename_all = "snake_case")]
pub enum Preview {
    /// No target, or the drop would leave everything where it is.
    #[default]
    Nothing,
    Allowed { affordance: Affordance },
    Blocked { reason: String },
}

impl Preview {
    pub fn blocked(error: &MoveError) -> Self { Self::Blocked { reason: error.to_string() } }
}

/// A drag in progress. Lives from drag start until release or cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub active: MenuItemId,
    pub hover: Option<DropTarget>,
    pub preview: Preview,
}

impl DragSession {
    pub fn new(active: MenuItemId) -> Self { Self { active, hover: None, preview: Preview::Nothing } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(DragSession),
    /// Transient: set on release while the mutation engine runs and
    /// replaced by `Idle` before `reduce` returns, so callers only ever
    /// observe `Idle` or `Dragging` between events.
    Committing { active: MenuItemId },
}

impl DragPhase {
    pub fn is_idle(&self) -> bool { matches!(self, Self::Idle) }
    pub fn session(&self) -> Option<&DragSession> {
        match self { Self::Dragging(session) => Some(session), _ => None }
    }
}
