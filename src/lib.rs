//! NextKala menu service
//!
//! Hierarchical navigation menus for the NextKala storefront admin panel.
//!
//! ## Features
//! - Menu tree model: flat parent-pointer records <-> nested forest
//! - Drag-and-drop reconciliation with cycle prevention and depth limits
//! - Drag session controller with live drop previews
//! - Postgres persistence of item payloads and ordering
//! - HTTP API for the admin panel

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod editor;
pub mod persistence;

pub use domain::aggregates::{ItemPayload, Menu, MenuItem, MenuNode, MoveResult, OrderingEntry};
pub use domain::tree::mutation::{Affordance, ContainerKind, DropTarget, MoveError, Placement, RootZone};
pub use domain::value_objects::{DepthLimit, Label, LinkKind, MenuItemId, TargetWindow};
pub use editor::MenuEditor;
pub use persistence::{InMemoryMenuRepository, MenuRepository, PgMenuRepository, RepositoryError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu not found")]
    MenuNotFound,

    #[error("Menu item not found: {0}")]
    ItemNotFound(MenuItemId),

    #[error("Menu item already exists: {0}")]
    DuplicateItem(MenuItemId),

    #[error(transparent)]
    InvalidMove(#[from] MoveError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

pub type Result<T> = std::result::Result<T, MenuError>;
