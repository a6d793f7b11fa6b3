//! Storage collaborators for menus.
//!
//! The tree core never talks to a database; it reads items once through
//! [`MenuRepository::load_items`] and hands back a full ordering through
//! [`MenuRepository::persist_ordering`] when the user saves.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::menu_item::{MenuItem, OrderingEntry};
use crate::domain::value_objects::MenuItemId;

mod memory;
mod postgres;

pub use memory::InMemoryMenuRepository;
pub use postgres::PgMenuRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Menu not found: {0}")]
    MenuNotFound(String),

    #[error("Menu slug already taken: {0}")]
    SlugTaken(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Ordering covers {given} of {expected} items")]
    IncompleteOrdering { expected: usize, given: usize },

    #[error("Unknown item in ordering: {0}")]
    UnknownItem(MenuItemId),

    #[error("Item listed twice in ordering: {0}")]
    DuplicateEntry(MenuItemId),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Storage unavailable")]
    Unavailable,
}

pub trait MenuRepository: Clone + Send + Sync + 'static {
    fn list_menus(&self) -> impl Future<Output = Result<Vec<MenuRecord>, RepositoryError>> + Send;

    fn create_menu(&self, name: &str, slug: &str) -> impl Future<Output = Result<MenuRecord, RepositoryError>> + Send;

    fn find_menu(&self, menu_id: &str) -> impl Future<Output = Result<Option<MenuRecord>, RepositoryError>> + Send;

    /// Every item of the menu, in no particular order.
    fn load_items(&self, menu_id: &str) -> impl Future<Output = Result<Vec<MenuItem>, RepositoryError>> + Send;

    /// Atomically replace the stored position of every item of the menu.
    fn persist_ordering(&self, menu_id: &str, entries: &[OrderingEntry]) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn create_item(&self, menu_id: &str, item: &MenuItem) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Store an item's payload. Its position is left alone.
    fn update_item(&self, menu_id: &str, item: &MenuItem) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_items(&self, menu_id: &str, ids: &[MenuItemId]) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// An ordering must name every stored item exactly once and may only point
/// at parents from the same menu.
pub(crate) fn check_ordering<'a>(
    stored: impl IntoIterator<Item = &'a MenuItemId>,
    entries: &[OrderingEntry],
) -> Result<(), RepositoryError> {
    let stored: HashSet<&MenuItemId> = stored.into_iter().collect();
    let mut listed: HashSet<&MenuItemId> = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !stored.contains(&entry.id) {
            return Err(RepositoryError::UnknownItem(entry.id.clone()));
        }
        if !listed.insert(&entry.id) {
            return Err(RepositoryError::DuplicateEntry(entry.id.clone()));
        }
        if let Some(parent) = &entry.parent_id {
            if !stored.contains(parent) {
                return Err(RepositoryError::UnknownItem(parent.clone()));
            }
        }
    }
    if listed.len() != stored.len() {
        return Err(RepositoryError::IncompleteOrdering { expected: stored.len(), given: listed.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, parent: Option<&str>, order: usize) -> OrderingEntry {
        OrderingEntry { id: MenuItemId::from(id), parent_id: parent.map(MenuItemId::from), order }
    }

    #[test]
    fn test_check_ordering() {
        let stored = [MenuItemId::from("A"), MenuItemId::from("B")];
        assert!(check_ordering(&stored, &[entry("A", None, 0), entry("B", Some("A"), 0)]).is_ok());
        assert!(matches!(
            check_ordering(&stored, &[entry("A", None, 0)]),
            Err(RepositoryError::IncompleteOrdering { expected: 2, given: 1 })
        ));
        assert!(matches!(
            check_ordering(&stored, &[entry("A", None, 0), entry("A", None, 1)]),
            Err(RepositoryError::DuplicateEntry(_))
        ));
        assert!(matches!(
            check_ordering(&stored, &[entry("A", None, 0), entry("B", Some("Z"), 0)]),
            Err(RepositoryError::UnknownItem(_))
        ));
    }
}
