//! Database schema initialization

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Create every record set if it does not exist yet
///
/// Uniqueness constraints mirror the record keys: product name, sku,
/// (tier, title), alias, missing basis and link `old`.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        -- Canonical product records
        CREATE TABLE IF NOT EXISTS information (
            product TEXT PRIMARY KEY,
            sku TEXT UNIQUE,
            account TEXT,
            class TEXT,
            category TEXT,
            subcategory TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_information_account ON information(account);
        CREATE INDEX IF NOT EXISTS idx_information_class ON information(class);
        CREATE INDEX IF NOT EXISTS idx_information_category ON information(category);
        CREATE INDEX IF NOT EXISTS idx_information_subcategory ON information(subcategory);

        -- Tier -> title taxonomy
        CREATE TABLE IF NOT EXISTS hierarchy (
            tier TEXT NOT NULL,
            title TEXT NOT NULL,
            PRIMARY KEY (tier, title)
        );

        -- External header aliases for canonical variables
        CREATE TABLE IF NOT EXISTS variable (
            variable TEXT NOT NULL,
            alias TEXT NOT NULL UNIQUE
        );
        CREATE INDEX IF NOT EXISTS idx_variable_variable ON variable(variable);

        -- Unresolved SKUs awaiting assignment
        CREATE TABLE IF NOT EXISTS missing (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            basis TEXT NOT NULL UNIQUE
        );

        -- Rename/merge edges, at most one per old identity
        CREATE TABLE IF NOT EXISTS link (
            old TEXT PRIMARY KEY,
            new TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_link_new ON link(new);

        -- Import runs
        CREATE TABLE IF NOT EXISTS import (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            date_of_import TEXT NOT NULL,
            row_count INTEGER NOT NULL DEFAULT 0
        );

        -- Imported time series, filed under product names
        CREATE TABLE IF NOT EXISTS observation (
            product TEXT NOT NULL,
            variable TEXT NOT NULL,
            date TEXT NOT NULL,
            value REAL NOT NULL,
            import_id INTEGER,
            PRIMARY KEY (product, variable, date)
        );
        CREATE INDEX IF NOT EXISTS idx_observation_import ON observation(import_id);
        "#,
    )?;

    let existing: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    if existing.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

/// Schema version recorded in the database, if any
pub fn schema_version(conn: &Connection) -> Result<Option<i32>> {
    Ok(conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?)
}
