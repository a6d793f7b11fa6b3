//! HTTP surface for the admin panel.

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::aggregates::menu::MoveResult;
use crate::domain::aggregates::menu_item::{ItemPayload, MenuItem, MenuNode, OrderingEntry};
use crate::domain::events::MenuEvent;
use crate::domain::tree::max_depth;
use crate::domain::tree::mutation::{DropTarget, MovePlan, Unchanged};
use crate::domain::value_objects::{DepthLimit, Label, LinkKind, MenuItemId, TargetWindow};
use crate::editor::{MenuEditor, RenderRow};
use crate::persistence::{MenuRecord, MenuRepository, RepositoryError};
use crate::MenuError;

#[derive(Clone)]
pub struct AppState<R> {
    pub repo: R,
    pub nats: Option<async_nats::Client>,
    pub limit: DepthLimit,
}

impl<R: MenuRepository> AppState<R> {
    pub fn new(repo: R, limit: DepthLimit) -> Self { Self { repo, nats: None, limit } }
    pub fn with_nats(mut self, nats: Option<async_nats::Client>) -> Self { self.nats = nats; self }
}

type ApiError = (StatusCode, String);

pub fn router<R: MenuRepository>(state: AppState<R>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "nextkala-menus"})) }))
        .route("/api/v1/menus", get(list_menus::<R>).post(create_menu::<R>))
        .route("/api/v1/menus/:menu_id/tree", get(get_tree::<R>))
        .route("/api/v1/menus/:menu_id/items", post(create_item::<R>))
        .route("/api/v1/menus/:menu_id/items/:item_id", put(update_item::<R>).delete(delete_item::<R>))
        .route("/api/v1/menus/:menu_id/moves", post(apply_move::<R>))
        .route("/api/v1/menus/:menu_id/ordering", put(save_ordering::<R>))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn internal(error: impl std::fmt::Display) -> ApiError {
    tracing::error!(%error, "menu storage failure");
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

fn reject(error: MenuError) -> ApiError {
    match error {
        MenuError::MenuNotFound => (StatusCode::NOT_FOUND, "Menu not found".to_string()),
        MenuError::ItemNotFound(_) => (StatusCode::NOT_FOUND, error.to_string()),
        MenuError::DuplicateItem(_) => (StatusCode::CONFLICT, error.to_string()),
        MenuError::InvalidMove(_) | MenuError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        MenuError::Storage(error) => match error {
            RepositoryError::MenuNotFound(_) | RepositoryError::InvalidId(_) => (StatusCode::NOT_FOUND, "Menu not found".to_string()),
            RepositoryError::SlugTaken(_) => (StatusCode::CONFLICT, error.to_string()),
            RepositoryError::IncompleteOrdering { .. } | RepositoryError::UnknownItem(_) | RepositoryError::DuplicateEntry(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }
            other => internal(other),
        },
    }
}

fn invalid(error: impl std::fmt::Display) -> ApiError { (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()) }

async fn open<R: MenuRepository>(s: &AppState<R>, menu_id: &str) -> Result<MenuEditor, ApiError> {
    MenuEditor::open(&s.repo, menu_id, s.limit).await.map_err(reject)
}

/// Publish drained domain events. Delivery problems are logged only.
async fn publish(nats: Option<&async_nats::Client>, events: Vec<MenuEvent>) {
    let Some(client) = nats else { return };
    for event in events {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(error) => { tracing::warn!(%error, "menu event not serializable"); continue; }
        };
        if let Err(error) = client.publish(event.subject(), payload.into()).await {
            tracing::warn!(%error, subject = %event.subject(), "publishing menu event failed");
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
}

async fn list_menus<R: MenuRepository>(State(s): State<AppState<R>>) -> Result<Json<Vec<MenuRecord>>, ApiError> {
    s.repo.list_menus().await.map(Json).map_err(internal)
}

async fn create_menu<R: MenuRepository>(State(s): State<AppState<R>>, Json(r): Json<CreateMenuRequest>) -> Result<(StatusCode, Json<MenuRecord>), ApiError> {
    r.validate().map_err(invalid)?;
    let slug = r.slug.unwrap_or_else(|| r.name.trim().to_lowercase().replace(' ', "-"));
    let menu = s.repo.create_menu(r.name.trim(), &slug).await.map_err(|e| reject(e.into()))?;
    tracing::info!(menu = %menu.id, slug = %menu.slug, "menu created");
    Ok((StatusCode::CREATED, Json(menu)))
}

/// Nested forest plus the flat render contract.
#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub id: String,
    pub name: String,
    pub max_levels: usize,
    pub levels: usize,
    pub dirty: bool,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<MenuNode>,
    pub rows: Vec<RenderRow>,
}

impl TreeResponse {
    fn from_editor(editor: &MenuEditor) -> Self {
        let menu = editor.menu();
        Self {
            id: menu.id().to_string(),
            name: menu.name().to_string(),
            max_levels: menu.limit().levels(),
            levels: max_depth(menu.forest(), menu.limit()),
            dirty: menu.is_dirty(),
            updated_at: menu.updated_at(),
            items: menu.forest().to_vec(),
            rows: editor.rows(),
        }
    }
}

async fn get_tree<R: MenuRepository>(State(s): State<AppState<R>>, Path(menu_id): Path<String>) -> Result<Json<TreeResponse>, ApiError> {
    let editor = open(&s, &menu_id).await?;
    Ok(Json(TreeResponse::from_editor(&editor)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub label: String,
    #[validate(length(max = 2048))]
    pub url: Option<String>,
    #[serde(default)]
    pub link_kind: LinkKind,
    #[serde(default)]
    pub target_window: TargetWindow,
    #[validate(length(max = 120))]
    pub rel_attribute: Option<String>,
    #[validate(length(max = 255))]
    pub css_classes: Option<String>,
    pub is_visible: Option<bool>,
    pub linked_resource_id: Option<String>,
}

impl ItemRequest {
    fn payload(self) -> Result<ItemPayload, ApiError> {
        self.validate().map_err(invalid)?;
        if self.link_kind.is_resource() && self.linked_resource_id.is_none() {
            return Err(invalid(format!("{} links need a linked_resource_id", self.link_kind.as_str())));
        }
        Ok(ItemPayload {
            label: Label::new(self.label).map_err(invalid)?,
            url: self.url,
            link_kind: self.link_kind,
            target_window: self.target_window,
            rel_attribute: self.rel_attribute,
            css_classes: self.css_classes,
            is_visible: self.is_visible.unwrap_or(true),
            linked_resource_id: self.linked_resource_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub parent_id: Option<MenuItemId>,
    #[serde(flatten)]
    pub item: ItemRequest,
}

async fn create_item<R: MenuRepository>(State(s): State<AppState<R>>, Path(menu_id): Path<String>, Json(r): Json<CreateItemRequest>) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let payload = r.item.payload()?;
    let mut editor = open(&s, &menu_id).await?;
    let item = editor.create_item(&s.repo, r.parent_id, payload).await.map_err(reject)?;
    publish(s.nats.as_ref(), editor.take_events()).await;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item<R: MenuRepository>(State(s): State<AppState<R>>, Path((menu_id, item_id)): Path<(String, MenuItemId)>, Json(r): Json<ItemRequest>) -> Result<Json<MenuItem>, ApiError> {
    let payload = r.payload()?;
    let mut editor = open(&s, &menu_id).await?;
    let item = editor.update_item(&s.repo, &item_id, payload).await.map_err(reject)?;
    publish(s.nats.as_ref(), editor.take_events()).await;
    Ok(Json(item))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse { pub removed: Vec<MenuItemId> }

async fn delete_item<R: MenuRepository>(State(s): State<AppState<R>>, Path((menu_id, item_id)): Path<(String, MenuItemId)>) -> Result<Json<DeleteResponse>, ApiError> {
    let mut editor = open(&s, &menu_id).await?;
    let removed = editor.remove_item(&s.repo, &item_id).await.map_err(reject)?;
    // Siblings left behind were renumbered.
    editor.save(&s.repo).await.map_err(reject)?;
    publish(s.nats.as_ref(), editor.take_events()).await;
    Ok(Json(DeleteResponse { removed }))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub source: MenuItemId,
    pub target: DropTarget,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveResponse {
    Moved { plan: MovePlan, message: String, items: Vec<MenuNode>, ordering: Vec<OrderingEntry> },
    Unchanged { reason: Unchanged },
}

/// Classify and apply one drop against the stored tree. Nothing is saved;
/// the client keeps the returned arrangement until it saves the ordering.
async fn apply_move<R: MenuRepository>(State(s): State<AppState<R>>, Path(menu_id): Path<String>, Json(r): Json<MoveRequest>) -> Result<Json<MoveResponse>, ApiError> {
    let mut editor = open(&s, &menu_id).await?;
    let response = match editor.apply_move(&r.source, &r.target).map_err(|e| reject(e.into()))? {
        MoveResult::Unchanged(reason) => MoveResponse::Unchanged { reason },
        MoveResult::Moved(plan) => MoveResponse::Moved {
            message: plan.affordance.describe(),
            plan,
            items: editor.menu().forest().to_vec(),
            ordering: editor.menu().ordering(),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SaveOrderingRequest { pub items: Vec<OrderingEntry> }

async fn save_ordering<R: MenuRepository>(State(s): State<AppState<R>>, Path(menu_id): Path<String>, Json(r): Json<SaveOrderingRequest>) -> Result<Json<TreeResponse>, ApiError> {
    let mut editor = open(&s, &menu_id).await?;
    editor.reorder(&r.items).map_err(reject)?;
    editor.save(&s.repo).await.map_err(reject)?;
    publish(s.nats.as_ref(), editor.take_events()).await;
    Ok(Json(TreeResponse::from_editor(&editor)))
}
