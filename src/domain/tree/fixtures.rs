//! Builders shared by the tree, aggregate and editor tests.

use crate::domain::aggregates::menu_item::{ItemPayload, MenuItem, MenuNode};
use crate::domain::tree::{build_hierarchy, flatten};
use crate::domain::value_objects::{Label, MenuItemId};

pub(crate) fn item(id: &str, parent: Option<&str>, order: usize) -> MenuItem {
    MenuItem::new(
        MenuItemId::from(id),
        parent.map(MenuItemId::from),
        order,
        ItemPayload::new(Label::new(format!("label {id}")).unwrap()),
    )
}

pub(crate) fn forest(items: &[(&str, Option<&str>, usize)]) -> Vec<MenuNode> {
    let flat: Vec<MenuItem> = items.iter().map(|(id, parent, order)| item(id, *parent, *order)).collect();
    build_hierarchy(&flat)
}

pub(crate) fn shape(items: &[MenuItem]) -> Vec<(&str, Option<&str>, usize)> {
    items
        .iter()
        .map(|item| (item.id.as_str(), item.parent_id.as_ref().map(|p| p.as_str()), item.order))
        .collect()
}

/// Pre-order `(id, parent, order)` triples of a forest.
pub(crate) fn forest_shape(forest: &[MenuNode]) -> Vec<(String, Option<String>, usize)> {
    flatten(forest)
        .into_iter()
        .map(|row| (row.item.id.to_string(), row.item.parent_id.map(|p| p.to_string()), row.item.order))
        .collect()
}

pub(crate) fn id(value: &str) -> MenuItemId { MenuItemId::from(value) }

/// `n0 -> n1 -> ... -> n{len-1}`, each the only child of the one before.
pub(crate) fn chain(len: usize) -> Vec<MenuItem> {
    (0..len)
        .map(|i| {
            let parent = i.checked_sub(1).map(|up| MenuItemId::new(format!("n{up}")));
            MenuItem::new(MenuItemId::new(format!("n{i}")), parent, 0, ItemPayload::new(Label::new(format!("label {i}")).unwrap()))
        })
        .collect()
}
