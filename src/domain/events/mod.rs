//! Domain events
use serde::Serialize;
use crate::domain::tree::mutation::Affordance;
use crate::domain::value_objects::MenuItemId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MenuEvent {
    ItemCreated { menu_id: String, item_id: MenuItemId, parent_id: Option<MenuItemId> },
    ItemUpdated { menu_id: String, item_id: MenuItemId },
    ItemDeleted { menu_id: String, item_id: MenuItemId, removed: usize },
    ItemMoved { menu_id: String, item_id: MenuItemId, from_parent: Option<MenuItemId>, to_parent: Option<MenuItemId>, affordance: Affordance },
    OrderingSaved { menu_id: String, items: usize },
}

impl MenuEvent {
    pub fn menu_id(&self) -> &str {
        match self {
            Self::ItemCreated { menu_id, .. }
            | Self::ItemUpdated { menu_id, .. }
            | Self::ItemDeleted { menu_id, .. }
            | Self::ItemMoved { menu_id, .. }
            | Self::OrderingSaved { menu_id, .. } => menu_id,
        }
    }

    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let name = match self {
            Self::ItemCreated { .. } => "item_created",
            Self::ItemUpdated { .. } => "item_updated",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::ItemMoved { .. } => "item_moved",
            Self::OrderingSaved { .. } => "ordering_saved",
        };
        format!("menus.{}.{}", self.menu_id(), name)
    }
}
