//! Catalog identity engine
//!
//! Operations that span several record sets: renames that cascade into the
//! link graph and observations, missing-SKU assignment, bulk imports and
//! hierarchy title changes. Each operation runs inside one SAVEPOINT, so a
//! failing step rolls the whole operation back.
//!
//! The engine either owns its connection ([`Engine::open`]), in which case
//! each successful operation is committed on return, or borrows one
//! ([`Engine::attach`]). A borrowed connection is never committed or closed
//! by the engine; attach it inside a transaction to keep several operations
//! under the caller's commit.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::core::error::{CatalogError, Result};
use crate::core::record::{Attribute, Patch, ProductRecord};
use crate::core::store::schema::init_schema;
use crate::core::store::{
    normalize_alias, placeholder_name, AliasStore, BulkStats, CatalogStore, HierarchyStore,
    ImportLog, LinkGraph, MissingEntry, MissingQueue, Observation, ObservationStore,
    RelinkPivot,
};

const SAVEPOINT: &str = "catalog_op";

enum Handle<'c> {
    Owned(Connection),
    Attached(&'c Connection),
}

/// Result of a rename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOutcome {
    /// Link edges whose endpoint changed
    pub links: usize,
    /// Observation rows re-filed
    pub observations: usize,
}

/// Result of assigning a missing sku to a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOutcome {
    pub id: i64,
    pub placeholder: String,
    /// Sku the product held before the assignment
    pub previous_sku: Option<String>,
    /// Rows and edges moved from the placeholder; zero when none existed
    pub placeholder_rows: usize,
}

impl AssignOutcome {
    pub fn placeholder_found(&self) -> bool {
        self.placeholder_rows > 0
    }
}

/// Result of staging a sku
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The sku already belongs to this product; nothing was staged
    Known(String),
    Staged(MissingEntry),
}

/// Result of a bulk product import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Product-less rows whose sku is already assigned
    pub known_skus: usize,
    /// Unknown skus placed in the missing queue
    pub staged: Vec<MissingEntry>,
    /// Staged skus that the import assigned to a product
    pub settled: Vec<String>,
}

/// Result of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub observations: usize,
    pub sku_moved: bool,
}

/// One imported value keyed by sku
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub sku: String,
    pub variable: String,
    pub date: NaiveDate,
    pub value: f64,
}

/// Result of an observation import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationImport {
    pub import_id: i64,
    pub recorded: usize,
    pub staged: Vec<MissingEntry>,
}

/// Orchestrates the catalog stores over one connection
pub struct Engine<'c> {
    handle: Handle<'c>,
}

/// Open a catalog database file and make sure the schema exists
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    init_schema(&conn)?;
    Ok(conn)
}

impl Engine<'static> {
    /// Open a catalog file with a private connection
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_connection(path)?;
        debug!(path = %path.display(), "opened catalog");
        Ok(Self {
            handle: Handle::Owned(conn),
        })
    }

    /// Private in-memory catalog
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            handle: Handle::Owned(conn),
        })
    }
}

impl<'c> Engine<'c> {
    /// Work on a caller-owned connection or transaction
    pub fn attach(conn: &'c Connection) -> Result<Self> {
        init_schema(conn)?;
        Ok(Self {
            handle: Handle::Attached(conn),
        })
    }

    pub fn connection(&self) -> &Connection {
        match &self.handle {
            Handle::Owned(conn) => conn,
            Handle::Attached(conn) => conn,
        }
    }

    pub fn owns_connection(&self) -> bool {
        matches!(self.handle, Handle::Owned(_))
    }

    // =========================================================================
    // Store views
    // =========================================================================

    pub fn catalog(&self) -> CatalogStore<'_> {
        CatalogStore::new(self.connection())
    }

    pub fn hierarchy(&self) -> HierarchyStore<'_> {
        HierarchyStore::new(self.connection())
    }

    pub fn aliases(&self) -> AliasStore<'_> {
        AliasStore::new(self.connection())
    }

    pub fn missing(&self) -> MissingQueue<'_> {
        MissingQueue::new(self.connection())
    }

    pub fn links(&self) -> LinkGraph<'_> {
        LinkGraph::new(self.connection())
    }

    pub fn observations(&self) -> ObservationStore<'_> {
        ObservationStore::new(self.connection())
    }

    pub fn imports(&self) -> ImportLog<'_> {
        ImportLog::new(self.connection())
    }

    /// Run `op` inside a savepoint, rolling back everything it did on error
    fn atomic<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connection();
        conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT))?;
        match op(conn) {
            Ok(value) => {
                conn.execute_batch(&format!("RELEASE {}", SAVEPOINT))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = conn.execute_batch(&format!(
                    "ROLLBACK TO {sp}; RELEASE {sp}",
                    sp = SAVEPOINT
                )) {
                    warn!(error = %rollback, "rollback failed");
                }
                debug!(error = %err, "operation rolled back");
                Err(err)
            }
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub fn add_product(&self, record: &ProductRecord) -> Result<()> {
        self.atomic(|conn| {
            CatalogStore::new(conn).add(record)?;
            settle_assigned_skus(conn)?;
            info!(product = %record.product, "added product");
            Ok(())
        })
    }

    /// Apply a patch, running the rename cascade when it renames the product
    pub fn set_product(&self, name: &str, patch: &Patch) -> Result<()> {
        self.atomic(|conn| {
            let mut current = name.to_string();
            if let Some(new_name) = patch.get(Attribute::Product) {
                if new_name.is_empty() {
                    return Err(CatalogError::InvalidPatch(
                        "product name cannot be cleared".to_string(),
                    ));
                }
                if new_name != name {
                    rename_in(conn, name, new_name)?;
                    current = new_name.to_string();
                }
            }

            CatalogStore::new(conn).set(&current, &patch.without_product())?;
            if patch.get(Attribute::Sku).is_some_and(|s| !s.is_empty()) {
                settle_assigned_skus(conn)?;
            }
            info!(product = %current, "updated product");
            Ok(())
        })
    }

    pub fn set_products(&self, names: &[String], patch: &Patch) -> Result<usize> {
        self.atomic(|conn| {
            let updated = CatalogStore::new(conn).set_bulk(names, patch)?;
            info!(updated, "bulk updated products");
            Ok(updated)
        })
    }

    pub fn remove_product(&self, name: &str) -> Result<bool> {
        self.atomic(|conn| {
            let removed = CatalogStore::new(conn).remove(name)?;
            if removed {
                info!(product = name, "removed product");
            }
            Ok(removed)
        })
    }

    /// Rename a product and every reference to its old name
    pub fn rename(&self, old: &str, new: &str) -> Result<RenameOutcome> {
        self.atomic(|conn| rename_in(conn, old, new))
    }

    /// Fold `from` into `into`
    ///
    /// Observations move to `into`, which also inherits `from`'s sku when it
    /// has none. `from` leaves the catalog and an edge `from → into` records
    /// the merge.
    pub fn merge(&self, from: &str, into: &str) -> Result<MergeOutcome> {
        self.atomic(|conn| {
            if from == into {
                return Err(CatalogError::LinkCycle {
                    old: from.to_string(),
                    new: into.to_string(),
                });
            }
            let catalog = CatalogStore::new(conn);
            let source = catalog
                .get(from)?
                .ok_or_else(|| CatalogError::not_found("product", from))?;
            let target = catalog
                .get(into)?
                .ok_or_else(|| CatalogError::not_found("product", into))?;

            let observations = ObservationStore::new(conn).rename_product(from, into)?;

            let mut sku_moved = false;
            if let (None, Some(sku)) = (&target.sku, &source.sku) {
                catalog.set(from, &Patch::new().set(Attribute::Sku, ""))?;
                catalog.set(into, &Patch::new().set(Attribute::Sku, sku.as_str()))?;
                sku_moved = true;
            }

            catalog.remove(from)?;
            link_in(conn, from, into)?;

            info!(from, into, observations, sku_moved, "merged products");
            Ok(MergeOutcome {
                observations,
                sku_moved,
            })
        })
    }

    /// Import product-shaped rows
    ///
    /// Rows with a product name are inserted, or updated only when
    /// `overwrite` is set; an update writes every column the row carries,
    /// blank cells included. Rows with only a sku are checked against the
    /// catalog; unknown skus are staged in the missing queue.
    pub fn bulk_import(
        &self,
        rows: &[HashMap<String, String>],
        overwrite: bool,
    ) -> Result<ImportSummary> {
        self.atomic(|conn| {
            let catalog = CatalogStore::new(conn);
            let queue = MissingQueue::new(conn);
            let known = catalog.sku_to_product()?;

            let mut summary = ImportSummary::default();
            let mut records: Vec<Patch> = Vec::new();
            let mut names: Vec<String> = Vec::new();

            for row in rows {
                let product = row.get("product").map(String::as_str).unwrap_or("");
                if !product.is_empty() {
                    records.push(Patch::from_fields(row)?);
                    names.push(product.to_string());
                    continue;
                }

                match row.get("sku").map(String::as_str).filter(|s| !s.is_empty()) {
                    Some(sku) if known.contains_key(sku) => summary.known_skus += 1,
                    Some(sku) => {
                        let id = queue.stage(sku)?;
                        if !summary.staged.iter().any(|e| e.id == id) {
                            summary.staged.push(MissingEntry {
                                id,
                                basis: sku.to_string(),
                            });
                        }
                    }
                    None => {
                        return Err(CatalogError::InvalidRecord(
                            "row has neither a product nor a sku".to_string(),
                        ))
                    }
                }
            }

            let BulkStats {
                inserted,
                updated,
                unchanged,
            } = catalog.add_bulk(&names, &records, overwrite)?;
            summary.inserted = inserted;
            summary.updated = updated;
            summary.unchanged = unchanged;
            summary.settled = settle_assigned_skus(conn)?;

            for entry in &summary.staged {
                warn!(basis = %entry.basis, id = entry.id, "unknown sku staged");
            }
            info!(
                inserted,
                updated,
                unchanged,
                staged = summary.staged.len(),
                "imported products"
            );
            Ok(summary)
        })
    }

    /// Import time-series rows keyed by sku
    ///
    /// Variables go through the alias store. Rows for unknown skus are
    /// staged and filed under the placeholder name of their queue entry.
    pub fn import_observations(
        &self,
        source: &str,
        rows: &[ObservationRow],
        at: DateTime<Utc>,
    ) -> Result<ObservationImport> {
        self.atomic(|conn| {
            let log = ImportLog::new(conn);
            let queue = MissingQueue::new(conn);
            let store = ObservationStore::new(conn);
            let skus = CatalogStore::new(conn).sku_to_product()?;
            let aliases = AliasStore::new(conn).lookup()?;

            let import_id = log.begin(source, at)?;
            let mut staged: Vec<MissingEntry> = Vec::new();

            for row in rows {
                if row.sku.is_empty() {
                    return Err(CatalogError::InvalidRecord(
                        "observation row has no sku".to_string(),
                    ));
                }
                let key = normalize_alias(&row.variable);
                let variable = aliases.get(&key).cloned().unwrap_or(key);

                let product = match skus.get(&row.sku) {
                    Some(product) => product.clone(),
                    None => {
                        let id = queue.stage(&row.sku)?;
                        if !staged.iter().any(|e| e.id == id) {
                            warn!(basis = %row.sku, id, "unknown sku staged");
                            staged.push(MissingEntry {
                                id,
                                basis: row.sku.clone(),
                            });
                        }
                        placeholder_name(id)
                    }
                };

                store.record(&Observation {
                    product,
                    variable,
                    date: row.date,
                    value: row.value,
                    import_id: Some(import_id),
                })?;
            }

            log.finish(import_id, rows.len())?;
            info!(import_id, source, rows = rows.len(), "imported observations");
            Ok(ObservationImport {
                import_id,
                recorded: rows.len(),
                staged,
            })
        })
    }

    /// Map external header names to canonical names via the alias store
    ///
    /// Unaliased keys are kept in their normalized (trimmed, lower-case) form.
    pub fn normalize_fields(
        &self,
        fields: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        let lookup = self.aliases().lookup()?;
        Ok(fields
            .iter()
            .map(|(key, value)| {
                let key = normalize_alias(key);
                let key = lookup.get(&key).cloned().unwrap_or(key);
                (key, value.clone())
            })
            .collect())
    }

    // =========================================================================
    // Missing queue
    // =========================================================================

    /// Stage a sku unless a product already carries it
    pub fn stage_missing(&self, basis: &str) -> Result<StageOutcome> {
        self.atomic(|conn| {
            if basis.is_empty() {
                return Err(CatalogError::InvalidRecord("empty sku".to_string()));
            }
            if let Some(product) = CatalogStore::new(conn).product_for_sku(basis)? {
                return Ok(StageOutcome::Known(product));
            }
            let id = MissingQueue::new(conn).stage(basis)?;
            debug!(basis, id, "staged sku");
            Ok(StageOutcome::Staged(MissingEntry {
                id,
                basis: basis.to_string(),
            }))
        })
    }

    /// Give a staged sku to a product
    ///
    /// The caller is responsible for confirming an overwrite when the target
    /// already has a sku. A missing placeholder is not an error; it shows up
    /// as `placeholder_rows == 0`.
    pub fn assign_missing(&self, basis: &str, target: &str) -> Result<AssignOutcome> {
        self.atomic(|conn| {
            let catalog = CatalogStore::new(conn);
            let queue = MissingQueue::new(conn);

            let record = catalog
                .get(target)?
                .ok_or_else(|| CatalogError::not_found("product", target))?;
            let id = queue
                .id_of(basis)?
                .ok_or_else(|| CatalogError::not_found("missing sku", basis))?;

            catalog.set(target, &Patch::new().set(Attribute::Sku, basis))?;

            let placeholder = placeholder_name(id);
            let placeholder_rows = resolve_placeholder_in(conn, id, target)?;
            if placeholder_rows == 0 {
                warn!(basis, placeholder = %placeholder, "no data filed under placeholder");
            }

            queue.resolve(basis)?;
            info!(basis, product = target, id, "assigned missing sku");

            Ok(AssignOutcome {
                id,
                placeholder,
                previous_sku: record.sku,
                placeholder_rows,
            })
        })
    }

    /// Move everything filed under `TEMP-<id>` onto `target`
    pub fn resolve_placeholder(&self, id: i64, target: &str) -> Result<usize> {
        self.atomic(|conn| resolve_placeholder_in(conn, id, target))
    }

    // =========================================================================
    // Link graph
    // =========================================================================

    /// Record that `old` is now `new`; refuses self-loops and cycles
    pub fn link(&self, old: &str, new: &str) -> Result<()> {
        self.atomic(|conn| {
            link_in(conn, old, new)?;
            info!(old, new, "linked");
            Ok(())
        })
    }

    pub fn relink(&self, old: &str, new: &str, pivot: &RelinkPivot) -> Result<usize> {
        self.atomic(|conn| {
            let links = LinkGraph::new(conn);
            if old == new {
                return Err(CatalogError::LinkCycle {
                    old: old.to_string(),
                    new: new.to_string(),
                });
            }
            let changed = links.relink(old, new, pivot)?;
            if changed == 0 {
                let name = match pivot {
                    RelinkPivot::ByNew => format!("* -> {}", new),
                    RelinkPivot::ByOld => format!("{} -> *", old),
                    RelinkPivot::Anchor(anchor) => format!("{} -> *", anchor),
                };
                return Err(CatalogError::not_found("link", name));
            }
            ensure_acyclic(&links, old, new)?;
            info!(old, new, changed, "relinked");
            Ok(changed)
        })
    }

    pub fn unlink(&self, old: &str, new: &str) -> Result<()> {
        self.atomic(|conn| {
            if LinkGraph::new(conn).unlink(old, new)? == 0 {
                return Err(CatalogError::not_found("link", format!("{} -> {}", old, new)));
            }
            info!(old, new, "unlinked");
            Ok(())
        })
    }

    /// Every earlier identity that now maps to `product`
    pub fn prior_identities(&self, product: &str) -> Result<Vec<String>> {
        self.links().all_prior_identities_of(product)
    }

    /// Current identity for a possibly superseded name
    pub fn resolve_current(&self, name: &str) -> Result<String> {
        self.links().resolve_current(name)
    }

    // =========================================================================
    // Hierarchy & aliases
    // =========================================================================

    pub fn hierarchy_add(&self, tier: Attribute, title: &str) -> Result<bool> {
        ensure_tier(tier)?;
        self.atomic(|conn| HierarchyStore::new(conn).add_title(tier, title))
    }

    /// Rename a title and every product attribute holding it
    ///
    /// Renaming onto a title the tier already has folds the two together.
    /// Returns the number of products updated.
    pub fn hierarchy_rename(&self, tier: Attribute, old: &str, new: &str) -> Result<usize> {
        ensure_tier(tier)?;
        self.atomic(|conn| {
            let hierarchy = HierarchyStore::new(conn);
            if !hierarchy.contains(tier, old)? {
                return Err(CatalogError::not_found("title", format!("{}/{}", tier, old)));
            }
            if old == new {
                return Ok(0);
            }
            if hierarchy.contains(tier, new)? {
                hierarchy.remove_title(tier, old)?;
                debug!(tier = %tier, old, new, "folded title into existing one");
            } else {
                hierarchy.set_title(tier, old, new)?;
            }
            let products = CatalogStore::new(conn).replace_attribute(tier, old, Some(new))?;
            info!(tier = %tier, old, new, products, "renamed title");
            Ok(products)
        })
    }

    /// Remove a title and clear it from every product holding it
    pub fn hierarchy_remove(&self, tier: Attribute, title: &str) -> Result<usize> {
        ensure_tier(tier)?;
        self.atomic(|conn| {
            let hierarchy = HierarchyStore::new(conn);
            if hierarchy.remove_title(tier, title)? == 0 {
                return Err(CatalogError::not_found("title", format!("{}/{}", tier, title)));
            }
            let products = CatalogStore::new(conn).replace_attribute(tier, title, None)?;
            info!(tier = %tier, title, products, "removed title");
            Ok(products)
        })
    }

    pub fn alias_add(&self, variable: &str, alias: &str) -> Result<()> {
        self.atomic(|conn| AliasStore::new(conn).add_alias(variable, alias))
    }

    pub fn alias_set(&self, variable: &str, old: &str, new: &str) -> Result<()> {
        self.atomic(|conn| {
            if AliasStore::new(conn).set_alias(variable, old, new)? == 0 {
                return Err(CatalogError::not_found("alias", format!("{}/{}", variable, old)));
            }
            Ok(())
        })
    }

    pub fn alias_remove(&self, variable: &str, alias: &str) -> Result<()> {
        self.atomic(|conn| {
            if AliasStore::new(conn).remove_alias(variable, alias)? == 0 {
                return Err(CatalogError::not_found("alias", format!("{}/{}", variable, alias)));
            }
            Ok(())
        })
    }
}

fn ensure_tier(tier: Attribute) -> Result<()> {
    if tier.is_tier() {
        Ok(())
    } else {
        Err(CatalogError::NotATier(tier.to_string()))
    }
}

fn rename_in(conn: &Connection, old: &str, new: &str) -> Result<RenameOutcome> {
    let catalog = CatalogStore::new(conn);
    if !catalog.exists(old)? {
        return Err(CatalogError::not_found("product", old));
    }
    if new.is_empty() {
        return Err(CatalogError::InvalidPatch(
            "product name cannot be cleared".to_string(),
        ));
    }
    if old == new {
        return Ok(RenameOutcome::default());
    }
    if catalog.exists(new)? {
        return Err(CatalogError::NameCollision {
            from: old.to_string(),
            to: new.to_string(),
        });
    }

    catalog.set(old, &Patch::new().set(Attribute::Product, new))?;
    let graph = LinkGraph::new(conn);
    let links = graph.rename_endpoint(old, new)?;
    ensure_acyclic_from(&graph, new)?;
    let observations = ObservationStore::new(conn).rename_product(old, new)?;

    info!(old, new, links, observations, "renamed product");
    Ok(RenameOutcome {
        links,
        observations,
    })
}

fn link_in(conn: &Connection, old: &str, new: &str) -> Result<()> {
    let links = LinkGraph::new(conn);
    if old == new {
        return Err(CatalogError::LinkCycle {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
    links.link(old, new)?;
    ensure_acyclic(&links, old, new)
}

/// Fail with the edge `old → new` if following outgoing edges from `old` loops
fn ensure_acyclic(links: &LinkGraph<'_>, old: &str, new: &str) -> Result<()> {
    let chain = links.chain_from(old)?;
    let last = chain.last().map(String::as_str).unwrap_or(old);
    // The walk only stops early when the next hop was already visited.
    if links.outgoing_from(last)?.is_some() {
        return Err(CatalogError::LinkCycle {
            old: old.to_string(),
            new: new.to_string(),
        });
    }
    Ok(())
}

/// Fail if the chain leaving `name` loops back on itself
///
/// Every edge rewritten by a rename touches `name`, so any loop it closed
/// passes through `name`.
fn ensure_acyclic_from(links: &LinkGraph<'_>, name: &str) -> Result<()> {
    match links.outgoing_from(name)? {
        Some(next) => ensure_acyclic(links, name, &next),
        None => Ok(()),
    }
}

fn resolve_placeholder_in(conn: &Connection, id: i64, target: &str) -> Result<usize> {
    let placeholder = placeholder_name(id);
    let observations = ObservationStore::new(conn).rename_product(&placeholder, target)?;
    let graph = LinkGraph::new(conn);
    let links = graph.rename_endpoint(&placeholder, target)?;
    ensure_acyclic_from(&graph, target)?;
    debug!(placeholder = %placeholder, target, observations, links, "resolved placeholder");
    Ok(observations + links)
}

/// Drop staged skus that a product now carries, moving their placeholder data
fn settle_assigned_skus(conn: &Connection) -> Result<Vec<String>> {
    let skus = CatalogStore::new(conn).sku_to_product()?;
    let queue = MissingQueue::new(conn);

    let mut settled = Vec::new();
    for entry in queue.list()? {
        if let Some(product) = skus.get(&entry.basis) {
            resolve_placeholder_in(conn, entry.id, product)?;
            queue.resolve(&entry.basis)?;
            info!(basis = %entry.basis, product = %product, "staged sku settled");
            settled.push(entry.basis);
        }
    }
    Ok(settled)
}

#[cfg(test)]
mod tests;
