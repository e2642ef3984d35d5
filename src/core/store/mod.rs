//! SQLite-backed record sets
//!
//! Each store is a thin view over a borrowed connection. None of them
//! commits; transaction boundaries belong to the [`Engine`](crate::core::Engine)
//! or to whoever owns the connection.

mod alias;
mod catalog;
mod hierarchy;
mod imports;
mod links;
mod missing;
mod observations;
pub mod schema;

pub use alias::{normalize as normalize_alias, AliasEntry, AliasStore};
pub use catalog::{BulkStats, CatalogStore};
pub use hierarchy::{HierarchyEntry, HierarchyStore};
pub use imports::{ImportLog, ImportRecord};
pub use links::{LinkEdge, LinkGraph, RelinkPivot};
pub use missing::{placeholder_name, MissingEntry, MissingQueue, PLACEHOLDER_PREFIX};
pub use observations::{Observation, ObservationStore};
