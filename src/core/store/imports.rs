//! Import log: one row per import run

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ImportRecord {
    pub id: i64,
    pub source: String,
    pub imported_at: DateTime<Utc>,
    pub row_count: usize,
}

pub struct ImportLog<'c> {
    conn: &'c Connection,
}

impl<'c> ImportLog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Open an import run and return its id
    pub fn begin(&self, source: &str, at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO import (source, date_of_import) VALUES (?1, ?2)",
            params![source, at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish(&self, id: i64, row_count: usize) -> Result<()> {
        self.conn.execute(
            "UPDATE import SET row_count = ?1 WHERE id = ?2",
            params![row_count as i64, id],
        )?;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<ImportRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, source, date_of_import, row_count FROM import WHERE id = ?1",
                params![id],
                row_to_import,
            )
            .optional()?)
    }

    /// Every run, most recent first
    pub fn list(&self) -> Result<Vec<ImportRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, date_of_import, row_count FROM import ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], row_to_import)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_import(row: &Row<'_>) -> rusqlite::Result<ImportRecord> {
    Ok(ImportRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        imported_at: parse_datetime(row.get::<_, String>(2)?),
        row_count: row.get::<_, i64>(3)? as usize,
    })
}

/// Parse a stored timestamp, falling back to the epoch on bad data
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).single().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::schema::init_schema;

    #[test]
    fn test_begin_and_finish() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let log = ImportLog::new(&conn);

        let at = Utc.with_ymd_and_hms(2015, 3, 1, 12, 0, 0).unwrap();
        let id = log.begin("sales.csv", at).unwrap();
        log.finish(id, 42).unwrap();

        let record = log.get(id).unwrap().unwrap();
        assert_eq!(record.source, "sales.csv");
        assert_eq!(record.row_count, 42);
        assert_eq!(record.imported_at, at);
        assert_eq!(log.list().unwrap().len(), 1);
    }
}
