//! Core module - catalog records, stores and the identity engine

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod store;

pub use config::Config;
pub use engine::{
    open_connection, AssignOutcome, Engine, ImportSummary, MergeOutcome, ObservationImport,
    ObservationRow, RenameOutcome, StageOutcome,
};
pub use error::{CatalogError, Result};
pub use record::{Attribute, Filter, Patch, ProductRecord};
