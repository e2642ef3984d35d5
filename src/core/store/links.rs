//! Link graph: directed old → new product identity edges
//!
//! Each `old` has at most one outgoing edge. A `new` may collect many
//! incoming edges when several products were merged into it.

use std::collections::{HashSet, VecDeque};

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::{CatalogError, Result};

/// A directed identity edge
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LinkEdge {
    pub old: String,
    pub new: String,
}

/// Which edge(s) a relink rewrites
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelinkPivot {
    /// Edges pointing at `new` get `old` as their source
    ByNew,
    /// The edge leaving `old` is pointed at `new`
    ByOld,
    /// The edge leaving the named anchor is replaced by `old → new`
    Anchor(String),
}

pub struct LinkGraph<'c> {
    conn: &'c Connection,
}

impl<'c> LinkGraph<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert or replace the edge leaving `old`
    pub fn link(&self, old: &str, new: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO link (old, new) VALUES (?1, ?2)",
            params![old, new],
        )?;
        Ok(())
    }

    /// Rewrite existing edges; returns the number of edges changed
    pub fn relink(&self, old: &str, new: &str, pivot: &RelinkPivot) -> Result<usize> {
        let changed = match pivot {
            RelinkPivot::ByNew => self.conn.execute(
                "UPDATE link SET old = ?1 WHERE new = ?2",
                params![old, new],
            )?,
            RelinkPivot::ByOld => self.conn.execute(
                "UPDATE link SET new = ?2 WHERE old = ?1",
                params![old, new],
            )?,
            RelinkPivot::Anchor(anchor) => self.conn.execute(
                "UPDATE link SET old = ?1, new = ?2 WHERE old = ?3",
                params![old, new, anchor],
            )?,
        };
        Ok(changed)
    }

    pub fn unlink(&self, old: &str, new: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM link WHERE old = ?1 AND new = ?2",
            params![old, new],
        )?)
    }

    /// Every edge ordered by `old`
    pub fn all(&self) -> Result<Vec<LinkEdge>> {
        let mut stmt = self.conn.prepare("SELECT old, new FROM link ORDER BY old")?;
        let rows = stmt.query_map([], |row| {
            Ok(LinkEdge {
                old: row.get(0)?,
                new: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Direct predecessors of `new`
    pub fn incoming_to(&self, new: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT old FROM link WHERE new = ?1 ORDER BY old")?;
        let rows = stmt.query_map(params![new], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    pub fn outgoing_from(&self, old: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT new FROM link WHERE old = ?1",
                params![old],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Every identity that now maps, directly or through a chain, to `product`
    ///
    /// Breadth-first, nearest predecessors first.
    pub fn all_prior_identities_of(&self, product: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        visited.insert(product.to_string());
        queue.push_back(product.to_string());

        while let Some(current) = queue.pop_front() {
            for old in self.incoming_to(&current)? {
                if visited.insert(old.clone()) {
                    results.push(old.clone());
                    queue.push_back(old);
                }
            }
        }

        Ok(results)
    }

    /// Follow outgoing edges from `name` to its current identity
    ///
    /// Returns the chain walked, starting with `name`. A chain that loops
    /// back on itself stops before revisiting a node.
    pub fn chain_from(&self, name: &str) -> Result<Vec<String>> {
        let mut chain = vec![name.to_string()];
        let mut visited: HashSet<String> = chain.iter().cloned().collect();

        let mut current = name.to_string();
        while let Some(next) = self.outgoing_from(&current)? {
            if !visited.insert(next.clone()) {
                break;
            }
            chain.push(next.clone());
            current = next;
        }

        Ok(chain)
    }

    /// Final identity reached from `name`
    pub fn resolve_current(&self, name: &str) -> Result<String> {
        let chain = self.chain_from(name)?;
        Ok(chain.last().cloned().unwrap_or_else(|| name.to_string()))
    }

    /// Replace `from` with `to` at both edge endpoints
    ///
    /// Direction is kept and edges between the two names, which would
    /// collapse into self-loops, are dropped. When both names still have an
    /// outgoing edge the rename would lose one of them, so it fails with
    /// [`CatalogError::LinkConflict`] before touching anything. Returns the
    /// number of edges touched.
    pub fn rename_endpoint(&self, from: &str, to: &str) -> Result<usize> {
        let leaving_from = self.outgoing_from(from)?.filter(|n| n != to);
        let leaving_to = self.outgoing_from(to)?.filter(|n| n != from);
        if let (Some(_), Some(existing)) = (&leaving_from, leaving_to) {
            return Err(CatalogError::LinkConflict {
                name: to.to_string(),
                existing,
            });
        }

        let dropped = self.conn.execute(
            "DELETE FROM link WHERE (old = ?1 AND new = ?2) OR (old = ?2 AND new = ?1)",
            params![from, to],
        )?;
        let sources = self.conn.execute(
            "UPDATE link SET old = ?2 WHERE old = ?1",
            params![from, to],
        )?;
        let targets = self.conn.execute(
            "UPDATE link SET new = ?2 WHERE new = ?1",
            params![from, to],
        )?;
        Ok(dropped + sources + targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::schema::init_schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_link_replaces_edge_from_old() {
        let conn = setup();
        let links = LinkGraph::new(&conn);

        links.link("OldCo", "NewCo").unwrap();
        assert_eq!(links.incoming_to("NewCo").unwrap(), vec!["OldCo"]);

        links.link("OldCo", "OtherCo").unwrap();
        assert!(links.incoming_to("NewCo").unwrap().is_empty());
        assert_eq!(links.incoming_to("OtherCo").unwrap(), vec!["OldCo"]);
        assert_eq!(links.all().unwrap().len(), 1);
    }

    #[test]
    fn test_fan_in() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("B", "Z").unwrap();
        links.link("A", "Z").unwrap();

        assert_eq!(links.incoming_to("Z").unwrap(), vec!["A", "B"]);
        let all: Vec<String> = links.all().unwrap().into_iter().map(|e| e.old).collect();
        assert_eq!(all, vec!["A", "B"]);
    }

    #[test]
    fn test_transitive_queries() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("A", "B").unwrap();
        links.link("B", "C").unwrap();
        links.link("X", "C").unwrap();

        let mut prior = links.all_prior_identities_of("C").unwrap();
        prior.sort();
        assert_eq!(prior, vec!["A", "B", "X"]);
        assert_eq!(links.resolve_current("A").unwrap(), "C");
        assert_eq!(links.chain_from("A").unwrap(), vec!["A", "B", "C"]);
        assert_eq!(links.resolve_current("C").unwrap(), "C");
    }

    #[test]
    fn test_chain_stops_on_loop() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("A", "B").unwrap();
        links.link("B", "A").unwrap();

        assert_eq!(links.chain_from("A").unwrap(), vec!["A", "B"]);
        assert_eq!(links.all_prior_identities_of("A").unwrap(), vec!["B"]);
    }

    #[test]
    fn test_relink_modes() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("A", "Z").unwrap();

        assert_eq!(links.relink("A", "Y", &RelinkPivot::ByOld).unwrap(), 1);
        assert_eq!(links.outgoing_from("A").unwrap().as_deref(), Some("Y"));

        assert_eq!(links.relink("B", "Y", &RelinkPivot::ByNew).unwrap(), 1);
        assert_eq!(links.incoming_to("Y").unwrap(), vec!["B"]);

        assert_eq!(
            links
                .relink("C", "W", &RelinkPivot::Anchor("B".to_string()))
                .unwrap(),
            1
        );
        assert_eq!(
            links.all().unwrap(),
            vec![LinkEdge {
                old: "C".to_string(),
                new: "W".to_string()
            }]
        );
    }

    #[test]
    fn test_unlink() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("A", "B").unwrap();
        assert_eq!(links.unlink("A", "C").unwrap(), 0);
        assert_eq!(links.unlink("A", "B").unwrap(), 1);
        assert!(links.all().unwrap().is_empty());
    }

    #[test]
    fn test_rename_endpoint() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("OldCo", "NewCo").unwrap();
        links.link("NewCo", "Parent").unwrap();

        assert_eq!(links.rename_endpoint("NewCo", "BrandCo").unwrap(), 2);
        assert_eq!(links.outgoing_from("OldCo").unwrap().as_deref(), Some("BrandCo"));
        assert_eq!(links.outgoing_from("BrandCo").unwrap().as_deref(), Some("Parent"));
        assert!(links.outgoing_from("NewCo").unwrap().is_none());
    }

    #[test]
    fn test_rename_endpoint_refuses_to_drop_an_edge() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("Y", "Z").unwrap();
        links.link("X", "W").unwrap();

        let err = links.rename_endpoint("X", "Y").unwrap_err();
        assert!(matches!(err, CatalogError::LinkConflict { .. }));
        assert_eq!(links.all().unwrap().len(), 2);
        assert_eq!(links.outgoing_from("Y").unwrap().as_deref(), Some("Z"));
    }

    #[test]
    fn test_rename_endpoint_drops_self_loops() {
        let conn = setup();
        let links = LinkGraph::new(&conn);
        links.link("OldCo", "NewCo").unwrap();

        links.rename_endpoint("NewCo", "OldCo").unwrap();
        assert!(links.all().unwrap().is_empty());
    }
}
