//! Catalog store: canonical product records
//!
//! Rows live in the `information` table. Every value is bound as a
//! parameter; column names come from [`Attribute`] only.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::core::error::{CatalogError, Result};
use crate::core::record::{non_blank, Attribute, Filter, Patch, ProductRecord};

const SELECT_COLUMNS: &str =
    "SELECT product, sku, account, class, category, subcategory FROM information";

/// Outcome of a bulk add
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Catalog operations over a borrowed connection
pub struct CatalogStore<'c> {
    conn: &'c Connection,
}

impl<'c> CatalogStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Get a single product
    pub fn get(&self, name: &str) -> Result<Option<ProductRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE product = ?1", SELECT_COLUMNS),
                params![name],
                row_to_record,
            )
            .optional()?)
    }

    /// Check whether a product exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM information WHERE product = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    /// Every product, ordered by name
    pub fn get_all(&self) -> Result<Vec<ProductRecord>> {
        self.query(&Filter::new())
    }

    /// Products matching a filter
    pub fn query(&self, filter: &Filter) -> Result<Vec<ProductRecord>> {
        let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);
        let mut values: Vec<String> = Vec::new();

        for (attr, value) in filter.active() {
            values.push(if attr.matches_by_prefix() {
                format!("{}%", escape_like(value))
            } else {
                value.to_string()
            });
            if attr.matches_by_prefix() {
                sql.push_str(&format!(
                    " AND {} LIKE ?{} ESCAPE '\\'",
                    attr.as_str(),
                    values.len()
                ));
            } else {
                sql.push_str(&format!(" AND {} = ?{}", attr.as_str(), values.len()));
            }
        }
        sql.push_str(" ORDER BY product");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert a new product
    ///
    /// Unset attributes are left out of the insert.
    pub fn add(&self, record: &ProductRecord) -> Result<()> {
        if record.product.is_empty() {
            return Err(CatalogError::InvalidRecord(
                "record has no product name".to_string(),
            ));
        }
        if self.exists(&record.product)? {
            return Err(CatalogError::DuplicateProduct(record.product.clone()));
        }
        self.insert(record)
    }

    /// Insert new products and optionally update existing ones
    ///
    /// `names` is partitioned against the current catalog: names not yet
    /// present are inserted from their record, names already present are
    /// updated attribute-by-attribute only when `overwrite` is set. Every
    /// attribute a row carries is written on update, so a blank cell clears
    /// the stored value; attributes the row lacks are left alone.
    pub fn add_bulk(
        &self,
        names: &[String],
        rows: &[Patch],
        overwrite: bool,
    ) -> Result<BulkStats> {
        let current: HashSet<String> = self.all_names()?.into_iter().collect();
        let requested: HashSet<&String> = names.iter().collect();

        let mut to_insert: HashSet<String> = requested
            .iter()
            .filter(|n| !current.contains(n.as_str()))
            .map(|n| n.to_string())
            .collect();
        let mut to_update: HashSet<String> = requested
            .iter()
            .filter(|n| current.contains(n.as_str()))
            .map(|n| n.to_string())
            .collect();

        let mut stats = BulkStats::default();

        for row in rows {
            let record = ProductRecord::from_patch(row)?;
            let name = record.product.as_str();

            if to_insert.remove(name) {
                self.insert(&record)?;
                // A later row for the same name is an update.
                to_update.insert(record.product.clone());
                stats.inserted += 1;
            } else if to_update.contains(name) && overwrite {
                let patch = row.without_product();
                if patch.is_empty() {
                    stats.unchanged += 1;
                } else {
                    self.set(name, &patch)?;
                    stats.updated += 1;
                }
            } else {
                stats.unchanged += 1;
            }
        }

        debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "bulk add applied"
        );
        Ok(stats)
    }

    /// Apply a patch to one product
    ///
    /// An empty value clears the attribute. A patch that renames `product`
    /// only renames this row; callers go through the engine so the rename
    /// reaches the link graph and observations too.
    pub fn set(&self, name: &str, patch: &Patch) -> Result<()> {
        if !self.exists(name)? {
            return Err(CatalogError::not_found("product", name));
        }
        if patch.get(Attribute::Product) == Some("") {
            return Err(CatalogError::InvalidPatch(
                "product name cannot be cleared".to_string(),
            ));
        }
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();
        for (attr, value) in patch.iter() {
            values.push(non_blank(value));
            assignments.push(format!("{} = ?{}", attr.as_str(), values.len()));
        }
        values.push(Some(name.to_string()));

        let sql = format!(
            "UPDATE information SET {} WHERE product = ?{}",
            assignments.join(", "),
            values.len()
        );
        self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    /// Apply the same patch to many products
    ///
    /// `product` and `sku` are unique per row and rejected when non-empty.
    /// Empty values leave the attribute untouched. Returns the number of
    /// rows updated.
    pub fn set_bulk(&self, names: &[String], patch: &Patch) -> Result<usize> {
        for attr in [Attribute::Product, Attribute::Sku] {
            if patch.get(attr).is_some_and(|v| !v.is_empty()) {
                return Err(CatalogError::InvalidPatch(format!(
                    "{} cannot be set on many products at once",
                    attr
                )));
            }
        }

        let mut assignments = Vec::new();
        let mut values: Vec<String> = Vec::new();
        for (attr, value) in patch.iter().filter(|(_, v)| !v.is_empty()) {
            values.push(value.to_string());
            assignments.push(format!("{} = ?{}", attr.as_str(), values.len()));
        }
        if assignments.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "UPDATE information SET {} WHERE product = ?{}",
            assignments.join(", "),
            values.len() + 1
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut updated = 0;
        for name in names {
            let mut bound: Vec<&str> = values.iter().map(String::as_str).collect();
            bound.push(name);
            updated += stmt.execute(params_from_iter(bound.iter()))?;
        }
        Ok(updated)
    }

    /// Delete a product; returns false when it did not exist
    pub fn remove(&self, name: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM information WHERE product = ?1", params![name])?;
        Ok(removed > 0)
    }

    /// Distinct values held by one attribute
    pub fn attribute_values(&self, attr: Attribute) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM information WHERE {col} IS NOT NULL ORDER BY {col}",
            col = attr.as_str()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// sku → product for every product that has a sku
    pub fn sku_to_product(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT sku, product FROM information WHERE sku IS NOT NULL")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<HashMap<String, String>>>()?)
    }

    /// Product owning a sku
    pub fn product_for_sku(&self, sku: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT product FROM information WHERE sku = ?1",
                params![sku],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Every product name, sorted
    pub fn all_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT product FROM information ORDER BY product")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Replace one tier value across every product holding it
    ///
    /// `None` clears the attribute. Returns the number of products changed.
    pub fn replace_attribute(
        &self,
        attr: Attribute,
        old: &str,
        new: Option<&str>,
    ) -> Result<usize> {
        let sql = format!(
            "UPDATE information SET {col} = ?1 WHERE {col} = ?2",
            col = attr.as_str()
        );
        Ok(self.conn.execute(&sql, params![new, old])?)
    }

    fn insert(&self, record: &ProductRecord) -> Result<()> {
        let present = record.present();
        let columns: Vec<&str> = present.iter().map(|(a, _)| a.as_str()).collect();
        let placeholders: Vec<String> = (1..=present.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO information ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn
            .execute(&sql, params_from_iter(present.iter().map(|(_, v)| *v)))?;
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
    Ok(ProductRecord {
        product: row.get(0)?,
        sku: row.get(1)?,
        account: row.get(2)?,
        class: row.get(3)?,
        category: row.get(4)?,
        subcategory: row.get(5)?,
    })
}

/// Escape LIKE wildcards so a prefix filter matches literally
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
