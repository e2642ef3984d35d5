//! Missing queue: SKUs seen in imports with no matching product

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::Result;

/// Prefix of the provisional product name that holds data for a staged sku
pub const PLACEHOLDER_PREFIX: &str = "TEMP-";

/// A staged basis sku
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MissingEntry {
    pub id: i64,
    pub basis: String,
}

impl MissingEntry {
    pub fn placeholder(&self) -> String {
        placeholder_name(self.id)
    }
}

/// Provisional product name for a staged id
pub fn placeholder_name(id: i64) -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, id)
}

pub struct MissingQueue<'c> {
    conn: &'c Connection,
}

impl<'c> MissingQueue<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Stage a basis, returning its id
    ///
    /// Staging the same basis again returns the id it already has.
    pub fn stage(&self, basis: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO missing (basis) VALUES (?1)",
            params![basis],
        )?;
        Ok(self.conn.query_row(
            "SELECT id FROM missing WHERE basis = ?1",
            params![basis],
            |row| row.get(0),
        )?)
    }

    /// Staged entries in staging order
    pub fn list(&self) -> Result<Vec<MissingEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, basis FROM missing ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(MissingEntry {
                id: row.get(0)?,
                basis: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn id_of(&self, basis: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM missing WHERE basis = ?1",
                params![basis],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Drop a basis from the queue; returns false if it was not staged
    pub fn resolve(&self, basis: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM missing WHERE basis = ?1", params![basis])?;
        Ok(removed > 0)
    }
}
