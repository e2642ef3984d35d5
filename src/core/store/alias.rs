//! Alias store: external header names for canonical variables
//!
//! Aliases are stored lower-cased and looked up case-insensitively, so
//! `"Units Sold"` and `"units sold"` from two import files resolve alike.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::Result;

/// A (variable, alias) pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AliasEntry {
    pub variable: String,
    pub alias: String,
}

pub struct AliasStore<'c> {
    conn: &'c Connection,
}

impl<'c> AliasStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn add_alias(&self, variable: &str, alias: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO variable (variable, alias) VALUES (?1, ?2)",
            params![variable, normalize(alias)],
        )?;
        Ok(())
    }

    pub fn set_alias(&self, variable: &str, old: &str, new: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE variable SET alias = ?1 WHERE variable = ?2 AND alias = ?3",
            params![normalize(new), variable, normalize(old)],
        )?)
    }

    pub fn remove_alias(&self, variable: &str, alias: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM variable WHERE variable = ?1 AND alias = ?2",
            params![variable, normalize(alias)],
        )?)
    }

    /// Canonical variables that have aliases
    pub fn variables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT variable FROM variable ORDER BY variable")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Aliases of one variable (editing direction)
    pub fn aliases_for(&self, variable: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT alias FROM variable WHERE variable = ?1 ORDER BY alias")?;
        let rows = stmt.query_map(params![variable], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// alias → variable for every alias (import direction)
    pub fn lookup(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT alias, variable FROM variable")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<HashMap<String, String>>>()?)
    }

    /// Variable an alias stands for
    pub fn resolve(&self, alias: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT variable FROM variable WHERE alias = ?1",
                params![normalize(alias)],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn all(&self) -> Result<Vec<AliasEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT variable, alias FROM variable ORDER BY variable, alias")?;
        let rows = stmt.query_map([], |row| {
            Ok(AliasEntry {
                variable: row.get(0)?,
                alias: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Alias key form: trimmed and lower-cased
pub fn normalize(alias: &str) -> String {
    alias.trim().to_lowercase()
}
