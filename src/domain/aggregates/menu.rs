//! Menu Aggregate

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use crate::domain::aggregates::menu_item::{ItemPayload, MenuItem, MenuNode, OrderingEntry};
use crate::domain::events::MenuEvent;
use crate::domain::tree::mutation::{apply_move, plan_move, DropTarget, MoveError, MoveOutcome, MovePlan, Planned, Unchanged};
use crate::domain::tree::{self, build_hierarchy, densify, densify_all, find_descendants, find_node, flatten, heal, resolve, FlatNode};
use crate::domain::value_objects::{DepthLimit, MenuItemId};
use crate::{MenuError, Result};

/// Result of a committed drop, as seen by the aggregate's callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveResult {
    Moved(MovePlan),
    Unchanged(Unchanged),
}

/// All items of one menu. The nested forest is the committed state; it is
/// replaced wholesale by every mutation and never edited in place.
#[derive(Clone, Debug)]
pub struct Menu {
    id: String,
    name: String,
    forest: Vec<MenuNode>,
    limit: DepthLimit,
    dirty: bool,
    updated_at: DateTime<Utc>,
    events: Vec<MenuEvent>,
}

impl Menu {
    pub fn new(id: impl Into<String>, name: impl Into<String>, limit: DepthLimit) -> Self {
        Self { id: id.into(), name: name.into(), forest: vec![], limit, dirty: false, updated_at: Utc::now(), events: vec![] }
    }

    /// Rebuild a menu from stored items. Rank gaps, duplicate ranks,
    /// dangling parents, parent cycles and nesting past `limit` are healed
    /// before the nested forest exists; if that changed anything the menu
    /// starts out dirty.
    pub fn load(id: impl Into<String>, name: impl Into<String>, items: Vec<MenuItem>, limit: DepthLimit) -> Self {
        let flat = heal(&items, limit);
        let healed = build_hierarchy(&flat);
        let stored: HashMap<&MenuItemId, (Option<&MenuItemId>, usize)> =
            items.iter().map(|item| (&item.id, (item.parent_id.as_ref(), item.order))).collect();
        let dirty = flat.len() != items.len()
            || flat.iter().any(|item| stored.get(&item.id) != Some(&(item.parent_id.as_ref(), item.order)));
        if dirty {
            tracing::info!(items = flat.len(), "stored menu ordering was inconsistent, healed on load");
        }
        let mut menu = Self::new(id, name, limit);
        menu.forest = healed;
        menu.dirty = dirty;
        menu
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn forest(&self) -> &[MenuNode] { &self.forest }
    pub fn limit(&self) -> DepthLimit { self.limit }
    pub fn is_dirty(&self) -> bool { self.dirty }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn rows(&self) -> Vec<FlatNode> { flatten(&self.forest) }
    pub fn items(&self) -> Vec<MenuItem> { tree::items(&self.forest) }
    pub fn ordering(&self) -> Vec<OrderingEntry> { tree::ordering(&self.forest) }
    pub fn node(&self, id: &MenuItemId) -> Option<&MenuNode> { find_node(&self.forest, id) }

    /// Classify a drop without changing anything.
    pub fn preview_move(&self, source: &MenuItemId, target: &DropTarget) -> std::result::Result<Planned, MoveError> {
        plan_move(&self.forest, source, target, self.limit)
    }

    pub fn move_item(&mut self, source: &MenuItemId, target: &DropTarget) -> std::result::Result<MoveResult, MoveError> {
        match apply_move(&self.forest, source, target, self.limit)? {
            MoveOutcome::Unchanged(reason) => {
                tracing::debug!(menu = %self.id, item = %source, ?reason, "drop left menu unchanged");
                Ok(MoveResult::Unchanged(reason))
            }
            MoveOutcome::Applied { forest, plan } => {
                tracing::info!(menu = %self.id, item = %source, parent = ?plan.to_parent, index = plan.to_index, "menu item moved");
                self.forest = forest;
                self.raise_event(MenuEvent::ItemMoved {
                    menu_id: self.id.clone(),
                    item_id: plan.source.clone(),
                    from_parent: plan.from_parent.clone(),
                    to_parent: plan.to_parent.clone(),
                    affordance: plan.affordance.clone(),
                });
                self.mark_dirty();
                Ok(MoveResult::Moved(plan))
            }
        }
    }

    /// Append a new item as the last child of `parent`, or as the last root.
    pub fn add_item(&mut self, id: MenuItemId, parent: Option<MenuItemId>, payload: ItemPayload) -> Result<MenuItem> {
        if self.node(&id).is_some() {
            return Err(MenuError::DuplicateItem(id));
        }
        let order = match &parent {
            None => self.forest.len(),
            Some(parent_id) => {
                let row = self.rows().into_iter().find(|row| row.id() == parent_id).ok_or_else(|| MenuError::ItemNotFound(parent_id.clone()))?;
                if !self.limit.allows(row.depth + 1, 1) {
                    return Err(MoveError::DepthExceeded { levels: self.limit.levels() }.into());
                }
                row.child_count
            }
        };
        let item = MenuItem::new(id, parent, order, payload);
        let mut flat = self.items();
        flat.push(item.clone());
        self.forest = build_hierarchy(&flat);
        self.raise_event(MenuEvent::ItemCreated { menu_id: self.id.clone(), item_id: item.id.clone(), parent_id: item.parent_id.clone() });
        self.touch();
        Ok(item)
    }

    /// Replace an item's payload. Position is untouched.
    pub fn update_item(&mut self, id: &MenuItemId, payload: ItemPayload) -> Result<MenuItem> {
        let mut flat = self.items();
        let item = flat.iter_mut().find(|item| &item.id == id).ok_or_else(|| MenuError::ItemNotFound(id.clone()))?;
        item.payload = payload;
        let updated = item.clone();
        self.forest = build_hierarchy(&flat);
        self.raise_event(MenuEvent::ItemUpdated { menu_id: self.id.clone(), item_id: id.clone() });
        self.touch();
        Ok(updated)
    }

    /// Remove an item together with its whole subtree and renumber the
    /// siblings it leaves behind. Returns every removed id, root first.
    pub fn remove_item(&mut self, id: &MenuItemId) -> Result<Vec<MenuItemId>> {
        let node = self.node(id).ok_or_else(|| MenuError::ItemNotFound(id.clone()))?;
        let parent = node.item.parent_id.clone();
        let mut removed = vec![id.clone()];
        removed.extend(flatten(&node.children).into_iter().map(|row| row.item.id));
        let doomed = find_descendants(&self.forest, id);

        let mut flat: Vec<MenuItem> = self.items().into_iter().filter(|item| &item.id != id && !doomed.contains(&item.id)).collect();
        densify(&mut flat, parent.as_ref());
        self.forest = build_hierarchy(&flat);
        self.raise_event(MenuEvent::ItemDeleted { menu_id: self.id.clone(), item_id: id.clone(), removed: removed.len() });
        self.mark_dirty();
        Ok(removed)
    }

    /// Replace the whole arrangement with a client-supplied ordering. Every
    /// item must be listed exactly once; the result must be acyclic and fit
    /// the depth limit. Ranks are renumbered per sibling group.
    pub fn reorder(&mut self, entries: &[OrderingEntry]) -> Result<()> {
        let mut positions: HashMap<&MenuItemId, &OrderingEntry> = HashMap::with_capacity(entries.len());
        for entry in entries {
            if positions.insert(&entry.id, entry).is_some() {
                return Err(MenuError::Validation(format!("item {} listed twice", entry.id)));
            }
        }
        let mut flat = self.items();
        if positions.len() != flat.len() {
            return Err(MenuError::Validation(format!("ordering lists {} of {} items", positions.len(), flat.len())));
        }
        let known: HashSet<MenuItemId> = flat.iter().map(|item| item.id.clone()).collect();
        for item in &mut flat {
            let entry = positions.get(&item.id).ok_or_else(|| MenuError::ItemNotFound(item.id.clone()))?;
            if let Some(parent) = entry.parent_id.as_ref().filter(|parent| !known.contains(*parent)) {
                return Err(MenuError::ItemNotFound(parent.clone()));
            }
            item.parent_id = entry.parent_id.clone();
            item.order = entry.order;
        }
        densify_all(&mut flat);
        // Checked on the flat parent map; the nested forest is only built
        // once the ordering is known to be acyclic and shallow enough.
        let resolved = resolve(&flat);
        // Items caught in a cycle come back promoted to the root.
        if resolved.iter().any(|r| positions.get(&r.item.id).map(|entry| &entry.parent_id) != Some(&r.item.parent_id)) {
            return Err(MenuError::Validation("ordering contains a parent cycle".into()));
        }
        if resolved.iter().any(|r| r.depth >= self.limit.levels()) {
            return Err(MoveError::DepthExceeded { levels: self.limit.levels() }.into());
        }
        let forest = build_hierarchy(&flat);
        tracing::debug!(menu = %self.id, items = flat.len(), "menu reordered from client ordering");
        self.forest = forest;
        self.mark_dirty();
        Ok(())
    }

    /// Record that the current ordering has been persisted.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        let items = self.rows().len();
        self.raise_event(MenuEvent::OrderingSaved { menu_id: self.id.clone(), items });
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<MenuEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: MenuEvent) { self.events.push(e); }
    fn mark_dirty(&mut self) { self.dirty = true; self.touch(); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
