//! Domain layer: value objects, aggregates, the tree model and events.
pub mod aggregates;
pub mod events;
pub mod tree;
pub mod value_objects;
