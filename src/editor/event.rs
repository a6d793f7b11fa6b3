use crate::domain::tree::mutation::{DropTarget, MovePlan};
use crate::domain::value_objects::MenuItemId;

use super::session::Preview;

/// Pointer and toolbar events fed into the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    DragStarted { item: MenuItemId },
    /// The pointer moved over a new target (`None` when over nothing).
    DragOver { target: Option<DropTarget> },
    DragEnded { target: Option<DropTarget> },
    DragCancelled,
    ToggleDropZone { item: MenuItemId },
    ToggleCollapsed { item: MenuItemId },
}

/// What changed after an event, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEffect {
    PreviewChanged(Preview),
    MoveCommitted(MovePlan),
    /// The move was refused; the message is meant for the user.
    MoveRejected { message: String },
    DropZoneOpened { item: MenuItemId },
    DropZoneClosed { item: MenuItemId },
}
