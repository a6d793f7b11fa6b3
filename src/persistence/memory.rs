//! In-process repository for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{check_ordering, MenuRecord, MenuRepository, RepositoryError};
use crate::domain::aggregates::menu_item::{MenuItem, OrderingEntry};
use crate::domain::value_objects::MenuItemId;

#[derive(Default)]
struct Store {
    menus: Vec<MenuRecord>,
    items: HashMap<String, Vec<MenuItem>>,
}

#[derive(Clone, Default)]
pub struct InMemoryMenuRepository {
    store: Arc<RwLock<Store>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMenuRepository {
    pub fn new() -> Self { Self::default() }

    /// Seed a menu with items, bypassing validation.
    pub async fn insert_menu(&self, record: MenuRecord, items: Vec<MenuItem>) {
        let mut store = self.store.write().await;
        store.items.insert(record.id.clone(), items);
        store.menus.push(record);
    }

    /// Make every write fail with [`RepositoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) { Err(RepositoryError::Unavailable) } else { Ok(()) }
    }
}

impl MenuRepository for InMemoryMenuRepository {
    async fn list_menus(&self) -> Result<Vec<MenuRecord>, RepositoryError> {
        Ok(self.store.read().await.menus.clone())
    }

    async fn create_menu(&self, name: &str, slug: &str) -> Result<MenuRecord, RepositoryError> {
        self.check_available()?;
        let mut store = self.store.write().await;
        if store.menus.iter().any(|menu| menu.slug == slug) {
            return Err(RepositoryError::SlugTaken(slug.to_string()));
        }
        let now = Utc::now();
        let record = MenuRecord { id: Uuid::now_v7().to_string(), name: name.to_string(), slug: slug.to_string(), created_at: now, updated_at: now };
        store.items.insert(record.id.clone(), vec![]);
        store.menus.push(record.clone());
        Ok(record)
    }

    async fn find_menu(&self, menu_id: &str) -> Result<Option<MenuRecord>, RepositoryError> {
        Ok(self.store.read().await.menus.iter().find(|menu| menu.id == menu_id).cloned())
    }

    async fn load_items(&self, menu_id: &str) -> Result<Vec<MenuItem>, RepositoryError> {
        self.store.read().await.items.get(menu_id).cloned().ok_or_else(|| RepositoryError::MenuNotFound(menu_id.to_string()))
    }

    async fn persist_ordering(&self, menu_id: &str, entries: &[OrderingEntry]) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut store = self.store.write().await;
        let items = store.items.get_mut(menu_id).ok_or_else(|| RepositoryError::MenuNotFound(menu_id.to_string()))?;
        check_ordering(items.iter().map(|item| &item.id), entries)?;
        let positions: HashMap<&MenuItemId, &OrderingEntry> = entries.iter().map(|entry| (&entry.id, entry)).collect();
        for item in items.iter_mut() {
            if let Some(entry) = positions.get(&item.id) {
                item.parent_id = entry.parent_id.clone();
                item.order = entry.order;
            }
        }
        if let Some(menu) = store.menus.iter_mut().find(|menu| menu.id == menu_id) {
            menu.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn create_item(&self, menu_id: &str, item: &MenuItem) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut store = self.store.write().await;
        let items = store.items.get_mut(menu_id).ok_or_else(|| RepositoryError::MenuNotFound(menu_id.to_string()))?;
        items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, menu_id: &str, item: &MenuItem) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut store = self.store.write().await;
        let items = store.items.get_mut(menu_id).ok_or_else(|| RepositoryError::MenuNotFound(menu_id.to_string()))?;
        let stored = items.iter_mut().find(|stored| stored.id == item.id).ok_or_else(|| RepositoryError::UnknownItem(item.id.clone()))?;
        stored.payload = item.payload.clone();
        Ok(())
    }

    async fn delete_items(&self, menu_id: &str, ids: &[MenuItemId]) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut store = self.store.write().await;
        let items = store.items.get_mut(menu_id).ok_or_else(|| RepositoryError::MenuNotFound(menu_id.to_string()))?;
        items.retain(|item| !ids.contains(&item.id));
        Ok(())
    }
}
