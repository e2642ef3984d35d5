//! Hierarchy store: valid titles per tier

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::Result;
use crate::core::record::Attribute;

/// A (tier, title) pair
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HierarchyEntry {
    pub tier: Attribute,
    pub title: String,
}

pub struct HierarchyStore<'c> {
    conn: &'c Connection,
}

impl<'c> HierarchyStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Add a title; returns false if it was already listed
    pub fn add_title(&self, tier: Attribute, title: &str) -> Result<bool> {
        let added = self.conn.execute(
            "INSERT OR IGNORE INTO hierarchy (tier, title) VALUES (?1, ?2)",
            params![tier.as_str(), title],
        )?;
        Ok(added > 0)
    }

    /// Rename a title within its tier (hierarchy row only)
    pub fn set_title(&self, tier: Attribute, old: &str, new: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE hierarchy SET title = ?1 WHERE tier = ?2 AND title = ?3",
            params![new, tier.as_str(), old],
        )?)
    }

    /// Remove a title (hierarchy row only)
    pub fn remove_title(&self, tier: Attribute, title: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM hierarchy WHERE tier = ?1 AND title = ?2",
            params![tier.as_str(), title],
        )?)
    }

    pub fn contains(&self, tier: Attribute, title: &str) -> Result<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM hierarchy WHERE tier = ?1 AND title = ?2",
                params![tier.as_str(), title],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    /// Tiers that have at least one title
    pub fn tiers(&self) -> Result<Vec<Attribute>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT tier FROM hierarchy ORDER BY tier")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tiers = Vec::new();
        for tier in rows {
            // Rows are only written through `Attribute`, so unknown text is skipped.
            if let Ok(attr) = tier?.parse::<Attribute>() {
                tiers.push(attr);
            }
        }
        tiers.sort();
        Ok(tiers)
    }

    /// Titles for one tier, sorted
    pub fn titles_for(&self, tier: Attribute) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM hierarchy WHERE tier = ?1 ORDER BY title")?;
        let rows = stmt.query_map(params![tier.as_str()], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Every entry, grouped by tier in column order
    pub fn all(&self) -> Result<Vec<HierarchyEntry>> {
        let mut entries = Vec::new();
        for tier in Attribute::tiers() {
            for title in self.titles_for(*tier)? {
                entries.push(HierarchyEntry { tier: *tier, title });
            }
        }
        Ok(entries)
    }
}
