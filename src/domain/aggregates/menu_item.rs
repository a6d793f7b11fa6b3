//! Menu item records
//!
//! A [`MenuItem`] is the flat, persisted shape: parent pointer plus rank
//! among siblings. A [`MenuNode`] is the nested shape the editor renders;
//! its `children` are always rebuilt from the flat records.

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Label, LinkKind, MenuItemId, TargetWindow};

/// Presentation payload of a menu entry. Opaque to the tree algorithms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub label: Label,
    pub url: Option<String>,
    pub link_kind: LinkKind,
    pub target_window: TargetWindow,
    pub rel_attribute: Option<String>,
    pub css_classes: Option<String>,
    pub is_visible: bool,
    pub linked_resource_id: Option<String>,
}

impl ItemPayload {
    pub fn new(label: Label) -> Self {
        Self {
            label, url: None, link_kind: LinkKind::Custom, target_window: TargetWindow::SameWindow,
            rel_attribute: None, css_classes: None, is_visible: true, linked_resource_id: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self { self.url = Some(url.into()); self }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub parent_id: Option<MenuItemId>,
    pub order: usize,
    pub payload: ItemPayload,
}

impl MenuItem {
    pub fn new(id: MenuItemId, parent_id: Option<MenuItemId>, order: usize, payload: ItemPayload) -> Self {
        Self { id, parent_id, order, payload }
    }

    pub fn ordering_entry(&self) -> OrderingEntry {
        OrderingEntry { id: self.id.clone(), parent_id: self.parent_id.clone(), order: self.order }
    }
}

/// A menu item with its children materialized, sorted by `order`.
///
/// The derived impls recurse once per level, so nested forests are only
/// built from flat items whose depth was bounded first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub item: MenuItem,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn id(&self) -> &MenuItemId { &self.item.id }
}

/// Position of one item, as handed to the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingEntry {
    pub id: MenuItemId,
    pub parent_id: Option<MenuItemId>,
    pub order: usize,
}
