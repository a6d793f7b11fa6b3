//! Postgres-backed repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{check_ordering, MenuRecord, MenuRepository, RepositoryError};
use crate::domain::aggregates::menu_item::{ItemPayload, MenuItem, OrderingEntry};
use crate::domain::value_objects::{Label, MenuItemId, UnknownVariant};

#[derive(Debug, Clone, sqlx::FromRow)]
struct MenuRow { id: Uuid, name: String, slug: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<MenuRow> for MenuRecord {
    fn from(row: MenuRow) -> Self {
        Self { id: row.id.to_string(), name: row.name, slug: row.slug, created_at: row.created_at, updated_at: row.updated_at }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid, parent_id: Option<Uuid>, position: i32, label: String, url: Option<String>,
    link_kind: String, target_window: String, rel_attribute: Option<String>, css_classes: Option<String>,
    is_visible: bool, linked_resource_id: Option<String>,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = RepositoryError;
    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| RepositoryError::CorruptRow(format!("menu item {}: {what}", row.id));
        let payload = ItemPayload {
            label: Label::new(row.label.clone()).map_err(|e| corrupt(&e.to_string()))?,
            url: row.url,
            link_kind: row.link_kind.parse().map_err(|e: UnknownVariant| corrupt(&e.to_string()))?,
            target_window: row.target_window.parse().map_err(|e: UnknownVariant| corrupt(&e.to_string()))?,
            rel_attribute: row.rel_attribute,
            css_classes: row.css_classes,
            is_visible: row.is_visible,
            linked_resource_id: row.linked_resource_id,
        };
        let order = usize::try_from(row.position).map_err(|_| corrupt("negative position"))?;
        Ok(MenuItem::new(row.id.into(), row.parent_id.map(MenuItemId::from), order, payload))
    }
}

fn parse_id(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|_| RepositoryError::InvalidId(value.to_string()))
}

fn item_uuid(id: &MenuItemId) -> Result<Uuid, RepositoryError> { parse_id(id.as_str()) }

fn position(order: usize) -> Result<i32, RepositoryError> {
    i32::try_from(order).map_err(|_| RepositoryError::CorruptRow(format!("position {order} out of range")))
}

#[derive(Clone)]
pub struct PgMenuRepository { pool: PgPool }

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const ITEM_COLUMNS: &str = "id, parent_id, position, label, url, link_kind, target_window, rel_attribute, css_classes, is_visible, linked_resource_id";

impl MenuRepository for PgMenuRepository {
    async fn list_menus(&self) -> Result<Vec<MenuRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, MenuRow>("SELECT id, name, slug, created_at, updated_at FROM menus ORDER BY name").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(MenuRecord::from).collect())
    }

    async fn create_menu(&self, name: &str, slug: &str) -> Result<MenuRecord, RepositoryError> {
        let row = sqlx::query_as::<_, MenuRow>("INSERT INTO menus (id, name, slug, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) ON CONFLICT (slug) DO NOTHING RETURNING id, name, slug, created_at, updated_at")
            .bind(Uuid::now_v7()).bind(name).bind(slug)
            .fetch_optional(&self.pool).await?
            .ok_or_else(|| RepositoryError::SlugTaken(slug.to_string()))?;
        Ok(row.into())
    }

    async fn find_menu(&self, menu_id: &str) -> Result<Option<MenuRecord>, RepositoryError> {
        let id = parse_id(menu_id)?;
        let row = sqlx::query_as::<_, MenuRow>("SELECT id, name, slug, created_at, updated_at FROM menus WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(MenuRecord::from))
    }

    async fn load_items(&self, menu_id: &str) -> Result<Vec<MenuItem>, RepositoryError> {
        let id = parse_id(menu_id)?;
        let rows = sqlx::query_as::<_, MenuItemRow>(&format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE menu_id = $1 ORDER BY position, created_at"))
            .bind(id).fetch_all(&self.pool).await?;
        rows.into_iter().map(MenuItem::try_from).collect()
    }

    async fn persist_ordering(&self, menu_id: &str, entries: &[OrderingEntry]) -> Result<(), RepositoryError> {
        let menu = parse_id(menu_id)?;
        let mut tx = self.pool.begin().await?;
        let stored: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM menu_items WHERE menu_id = $1 FOR UPDATE").bind(menu).fetch_all(&mut *tx).await?;
        let stored: Vec<MenuItemId> = stored.into_iter().map(|(id,)| MenuItemId::from(id)).collect();
        check_ordering(&stored, entries)?;
        for entry in entries {
            let parent = entry.parent_id.as_ref().map(item_uuid).transpose()?;
            sqlx::query("UPDATE menu_items SET parent_id = $3, position = $4, updated_at = NOW() WHERE menu_id = $1 AND id = $2")
                .bind(menu).bind(item_uuid(&entry.id)?).bind(parent).bind(position(entry.order)?)
                .execute(&mut *tx).await?;
        }
        sqlx::query("UPDATE menus SET updated_at = NOW() WHERE id = $1").bind(menu).execute(&mut *tx).await?;
        tx.commit().await?;
        tracing::info!(menu = %menu, items = entries.len(), "menu ordering persisted");
        Ok(())
    }

    async fn create_item(&self, menu_id: &str, item: &MenuItem) -> Result<(), RepositoryError> {
        let menu = parse_id(menu_id)?;
        let parent = item.parent_id.as_ref().map(item_uuid).transpose()?;
        let p = &item.payload;
        sqlx::query("INSERT INTO menu_items (id, menu_id, parent_id, position, label, url, link_kind, target_window, rel_attribute, css_classes, is_visible, linked_resource_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW())")
            .bind(item_uuid(&item.id)?).bind(menu).bind(parent).bind(position(item.order)?)
            .bind(p.label.as_str()).bind(&p.url).bind(p.link_kind.as_str()).bind(p.target_window.as_str())
            .bind(&p.rel_attribute).bind(&p.css_classes).bind(p.is_visible).bind(&p.linked_resource_id)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_item(&self, menu_id: &str, item: &MenuItem) -> Result<(), RepositoryError> {
        let menu = parse_id(menu_id)?;
        let p = &item.payload;
        let result = sqlx::query("UPDATE menu_items SET label = $3, url = $4, link_kind = $5, target_window = $6, rel_attribute = $7, css_classes = $8, is_visible = $9, linked_resource_id = $10, updated_at = NOW() WHERE menu_id = $1 AND id = $2")
            .bind(menu).bind(item_uuid(&item.id)?)
            .bind(p.label.as_str()).bind(&p.url).bind(p.link_kind.as_str()).bind(p.target_window.as_str())
            .bind(&p.rel_attribute).bind(&p.css_classes).bind(p.is_visible).bind(&p.linked_resource_id)
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::UnknownItem(item.id.clone()));
        }
        Ok(())
    }

    async fn delete_items(&self, menu_id: &str, ids: &[MenuItemId]) -> Result<(), RepositoryError> {
        let menu = parse_id(menu_id)?;
        let ids: Vec<Uuid> = ids.iter().map(item_uuid).collect::<Result<_, _>>()?;
        sqlx::query("DELETE FROM menu_items WHERE menu_id = $1 AND id = ANY($2)").bind(menu).bind(ids).execute(&self.pool).await?;
        Ok(())
    }
}
