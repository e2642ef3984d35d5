//! Forecast catalog
//!
//! Canonical product records, a tier-based naming hierarchy, variable
//! aliases, a staging queue for unresolved SKUs and a rename/merge link
//! graph, kept mutually consistent in one SQLite database.

pub mod cli;
pub mod core;
