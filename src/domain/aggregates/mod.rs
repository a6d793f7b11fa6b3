//! Aggregates module
pub mod menu;
pub mod menu_item;

pub use menu::{Menu, MoveResult};
pub use menu_item::{ItemPayload, MenuItem, MenuNode, OrderingEntry};
