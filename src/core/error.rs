//! Catalog error types

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the catalog stores and the identity engine
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("product '{0}' already exists")]
    #[diagnostic(
        code(catalog::duplicate_product),
        help("use `product set` to change an existing product")
    )]
    DuplicateProduct(String),

    #[error("invalid record: {0}")]
    #[diagnostic(code(catalog::invalid_record))]
    InvalidRecord(String),

    #[error("invalid bulk patch: {0}")]
    #[diagnostic(
        code(catalog::invalid_patch),
        help("product and sku are unique per row and cannot be applied to many products")
    )]
    InvalidPatch(String),

    #[error("cannot rename '{from}' to '{to}': '{to}' is already a product")]
    #[diagnostic(
        code(catalog::name_collision),
        help("use `merge` to fold one product into another")
    )]
    NameCollision { from: String, to: String },

    #[error("{kind} '{name}' not found")]
    #[diagnostic(code(catalog::not_found))]
    NotFound { kind: &'static str, name: String },

    #[error("unknown attribute '{0}'")]
    #[diagnostic(
        code(catalog::unknown_attribute),
        help("valid attributes: product, sku, account, class, category, subcategory")
    )]
    UnknownAttribute(String),

    #[error("'{0}' is not a hierarchy tier")]
    #[diagnostic(
        code(catalog::not_a_tier),
        help("valid tiers: account, class, category, subcategory")
    )]
    NotATier(String),

    #[error("linking '{old}' to '{new}' would create a cycle")]
    #[diagnostic(code(catalog::link_cycle))]
    LinkCycle { old: String, new: String },

    #[error("'{name}' already links to '{existing}'")]
    #[diagnostic(
        code(catalog::link_conflict),
        help("remove or relink the existing link first")
    )]
    LinkConflict { name: String, existing: String },

    #[error("store failure: {0}")]
    #[diagnostic(code(catalog::store))]
    StoreFailure(#[from] rusqlite::Error),
}

impl CatalogError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CatalogError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
