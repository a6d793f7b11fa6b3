//! Menu editor
//!
//! Owns the drag session of one open menu. Pointer events go through
//! [`MenuEditor::reduce`], which previews with the same classifier the
//! commit uses and only touches the forest on release. Nothing is written
//! to storage until [`MenuEditor::save`].

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::aggregates::menu::{Menu, MoveResult};
use crate::domain::aggregates::menu_item::{ItemPayload, MenuItem, OrderingEntry};
use crate::domain::events::MenuEvent;
use crate::domain::tree::mutation::{DropTarget, MoveError, Planned};
use crate::domain::value_objects::{DepthLimit, MenuItemId};
use crate::persistence::MenuRepository;
use crate::{MenuError, Result};

mod event;
mod session;

pub use event::{EditorEffect, EditorEvent};
pub use session::{DragPhase, DragSession, Preview};

/// What the presentation layer needs to draw one visible row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRow {
    pub id: MenuItemId,
    pub label: String,
    pub depth: usize,
    pub has_children: bool,
    pub collapsed: bool,
    pub drop_zone_open: bool,
    /// The row being dragged.
    pub dragging: bool,
    /// The row the pointer is currently over, if the drop is allowed there.
    pub drop_target: bool,
}

pub struct MenuEditor {
    menu: Menu,
    phase: DragPhase,
    open_drop_zones: HashSet<MenuItemId>,
    collapsed: HashSet<MenuItemId>,
    last_message: Option<String>,
}

impl MenuEditor {
    pub fn new(menu: Menu) -> Self {
        Self { menu, phase: DragPhase::Idle, open_drop_zones: HashSet::new(), collapsed: HashSet::new(), last_message: None }
    }

    /// Load a menu through the repository. Called once when the editor mounts.
    pub async fn open<R: MenuRepository>(repo: &R, menu_id: &str, limit: DepthLimit) -> Result<Self> {
        let record = repo.find_menu(menu_id).await?.ok_or(MenuError::MenuNotFound)?;
        let items = repo.load_items(&record.id).await?;
        tracing::debug!(menu = %record.id, items = items.len(), "menu opened in editor");
        Ok(Self::new(Menu::load(record.id, record.name, items, limit)))
    }

    pub fn menu(&self) -> &Menu { &self.menu }
    pub fn phase(&self) -> &DragPhase { &self.phase }
    pub fn last_message(&self) -> Option<&str> { self.last_message.as_deref() }
    pub fn is_dirty(&self) -> bool { self.menu.is_dirty() }
    pub fn is_drop_zone_open(&self, id: &MenuItemId) -> bool { self.open_drop_zones.contains(id) }
    pub fn is_collapsed(&self, id: &MenuItemId) -> bool { self.collapsed.contains(id) }
    pub fn take_events(&mut self) -> Vec<MenuEvent> { self.menu.take_events() }

    /// Current preview, if a drag is in progress.
    pub fn preview(&self) -> Option<&Preview> { self.phase.session().map(|session| &session.preview) }

    pub fn reduce(&mut self, event: EditorEvent) -> Vec<EditorEffect> {
        match event {
            EditorEvent::DragStarted { item } => {
                self.start_drag(item);
                vec![]
            }
            EditorEvent::DragOver { target } => self.update_hover(target).into_iter().collect(),
            EditorEvent::DragEnded { target } => self.finish_drag(target),
            EditorEvent::DragCancelled => {
                if !self.phase.is_idle() {
                    tracing::debug!(menu = %self.menu.id(), "drag cancelled");
                }
                self.phase = DragPhase::Idle;
                vec![]
            }
            EditorEvent::ToggleDropZone { item } => self.toggle_drop_zone(item).into_iter().collect(),
            EditorEvent::ToggleCollapsed { item } => {
                if self.menu.node(&item).is_some() && !self.collapsed.remove(&item) {
                    self.collapsed.insert(item);
                }
                vec![]
            }
        }
    }

    fn start_drag(&mut self, item: MenuItemId) {
        if !self.phase.is_idle() {
            tracing::debug!(menu = %self.menu.id(), item = %item, "drag already in progress, ignoring");
            return;
        }
        if self.menu.node(&item).is_none() {
            return;
        }
        self.last_message = None;
        self.phase = DragPhase::Dragging(DragSession::new(item));
    }

    fn update_hover(&mut self, target: Option<DropTarget>) -> Option<EditorEffect> {
        let DragPhase::Dragging(session) = &self.phase else {
            return None;
        };
        if session.hover == target {
            return None;
        }
        let preview = match &target {
            None => Preview::Nothing,
            Some(target) => match self.menu.preview_move(&session.active, target) {
                Ok(Planned::Move(plan)) => Preview::Allowed { affordance: plan.affordance },
                Ok(Planned::Unchanged(_)) => Preview::Nothing,
                Err(error) => Preview::blocked(&error),
            },
        };
        let DragPhase::Dragging(session) = &mut self.phase else {
            return None;
        };
        session.hover = target;
        if session.preview == preview {
            return None;
        }
        session.preview = preview.clone();
        Some(EditorEffect::PreviewChanged(preview))
    }

    fn finish_drag(&mut self, target: Option<DropTarget>) -> Vec<EditorEffect> {
        let DragPhase::Dragging(session) = std::mem::take(&mut self.phase) else {
            return vec![];
        };
        let Some(target) = target else {
            return vec![];
        };
        self.phase = DragPhase::Committing { active: session.active.clone() };
        let mut effects = vec![];
        match self.commit(&session.active, &target, &mut effects) {
            Ok(MoveResult::Moved(plan)) => effects.push(EditorEffect::MoveCommitted(plan)),
            Ok(MoveResult::Unchanged(_)) => {}
            Err(error) => effects.push(EditorEffect::MoveRejected { message: error.to_string() }),
        }
        self.phase = DragPhase::Idle;
        effects
    }

    /// Run one drop through the menu. Closing the drop zone is reported
    /// through `effects`; the outcome itself is returned.
    fn commit(&mut self, source: &MenuItemId, target: &DropTarget, effects: &mut Vec<EditorEffect>) -> std::result::Result<MoveResult, MoveError> {
        let result = self.menu.move_item(source, target);
        match &result {
            Ok(MoveResult::Moved(plan)) => {
                self.last_message = None;
                if let Some(zone) = &plan.closes_drop_zone {
                    if self.open_drop_zones.remove(zone) {
                        effects.push(EditorEffect::DropZoneClosed { item: zone.clone() });
                    }
                }
            }
            Ok(MoveResult::Unchanged(_)) => {}
            Err(error) => {
                tracing::warn!(menu = %self.menu.id(), item = %source, %error, "move rejected");
                self.last_message = Some(error.to_string());
            }
        }
        result
    }

    fn toggle_drop_zone(&mut self, item: MenuItemId) -> Option<EditorEffect> {
        self.menu.node(&item)?;
        if self.open_drop_zones.remove(&item) {
            Some(EditorEffect::DropZoneClosed { item })
        } else {
            self.open_drop_zones.insert(item.clone());
            Some(EditorEffect::DropZoneOpened { item })
        }
    }

    /// Apply one drop outside of a pointer session, e.g. a move sent by a
    /// client that tracked the drag itself. Any session in progress is
    /// dropped.
    pub fn apply_move(&mut self, source: &MenuItemId, target: &DropTarget) -> std::result::Result<MoveResult, MoveError> {
        self.phase = DragPhase::Idle;
        self.commit(source, target, &mut vec![])
    }

    /// Take over a full ordering computed elsewhere. Unsaved until [`Self::save`].
    pub fn reorder(&mut self, entries: &[OrderingEntry]) -> Result<()> {
        self.phase = DragPhase::Idle;
        self.menu.reorder(entries)
    }

    /// Visible rows in pre-order. Descendants of collapsed rows are skipped.
    pub fn rows(&self) -> Vec<RenderRow> {
        let session = self.phase.session();
        let hovered = session
            .filter(|session| matches!(session.preview, Preview::Allowed { .. }))
            .and_then(|session| session.hover.as_ref())
            .and_then(DropTarget::item_id);
        let rows = self.menu.rows();
        // Pre-order: a parent's visibility is settled before its children.
        let mut hidden: Vec<bool> = Vec::with_capacity(rows.len());
        for row in &rows {
            let below_collapsed = row.parent_row.is_some_and(|pos| {
                hidden.get(pos).copied().unwrap_or(false) || rows.get(pos).is_some_and(|parent| self.collapsed.contains(parent.id()))
            });
            hidden.push(below_collapsed);
        }
        rows.into_iter()
            .zip(hidden)
            .filter(|(_, hidden)| !hidden)
            .map(|(row, _)| RenderRow {
                label: row.item.payload.label.to_string(),
                depth: row.depth,
                has_children: row.child_count > 0,
                collapsed: self.collapsed.contains(row.id()),
                drop_zone_open: self.open_drop_zones.contains(row.id()),
                dragging: session.is_some_and(|session| &session.active == row.id()),
                drop_target: hovered == Some(row.id()),
                id: row.item.id,
            })
            .collect()
    }

    /// Append a new item under `parent` (or at the root) and store it. The
    /// in-memory menu only changes once the repository accepted the item.
    pub async fn create_item<R: MenuRepository>(&mut self, repo: &R, parent: Option<MenuItemId>, payload: ItemPayload) -> Result<MenuItem> {
        let mut next = self.menu.clone();
        let item = next.add_item(MenuItemId::generate(), parent, payload)?;
        repo.create_item(next.id(), &item).await?;
        tracing::info!(menu = %next.id(), item = %item.id, "menu item created");
        self.menu = next;
        Ok(item)
    }

    pub async fn update_item<R: MenuRepository>(&mut self, repo: &R, id: &MenuItemId, payload: ItemPayload) -> Result<MenuItem> {
        let mut next = self.menu.clone();
        let item = next.update_item(id, payload)?;
        repo.update_item(next.id(), &item).await?;
        self.menu = next;
        Ok(item)
    }

    /// Delete an item and its subtree. The renumbered siblings are left
    /// unsaved.
    pub async fn remove_item<R: MenuRepository>(&mut self, repo: &R, id: &MenuItemId) -> Result<Vec<MenuItemId>> {
        let mut next = self.menu.clone();
        let removed = next.remove_item(id)?;
        repo.delete_items(next.id(), &removed).await?;
        tracing::info!(menu = %next.id(), item = %id, removed = removed.len(), "menu item removed");
        self.menu = next;
        for gone in &removed {
            self.open_drop_zones.remove(gone);
            self.collapsed.remove(gone);
        }
        Ok(removed)
    }

    /// Hand the full ordering to the repository. On failure the forest and
    /// the dirty flag are kept so the save can simply be retried.
    pub async fn save<R: MenuRepository>(&mut self, repo: &R) -> Result<Vec<OrderingEntry>> {
        let ordering = self.menu.ordering();
        match repo.persist_ordering(self.menu.id(), &ordering).await {
            Ok(()) => {
                self.menu.mark_saved();
                self.last_message = None;
                tracing::info!(menu = %self.menu.id(), items = ordering.len(), "menu ordering saved");
                Ok(ordering)
            }
            Err(error) => {
                tracing::warn!(menu = %self.menu.id(), %error, "saving menu ordering failed");
                self.last_message = Some(format!("could not save menu order: {error}"));
                Err(error.into())
            }
        }
    }
}
