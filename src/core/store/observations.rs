//! Observation store: imported time-series values filed under product names
//!
//! This is the data a rename has to carry along. Rows for SKUs that are
//! still in the missing queue are filed under the placeholder name until the
//! SKU is assigned.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use crate::core::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One imported value
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Observation {
    pub product: String,
    pub variable: String,
    pub date: NaiveDate,
    pub value: f64,
    pub import_id: Option<i64>,
}

pub struct ObservationStore<'c> {
    conn: &'c Connection,
}

impl<'c> ObservationStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Record a value; a later value for the same product/variable/date wins
    pub fn record(&self, obs: &Observation) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO observation (product, variable, date, value, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                obs.product,
                obs.variable,
                obs.date.format(DATE_FORMAT).to_string(),
                obs.value,
                obs.import_id
            ],
        )?;
        Ok(())
    }

    /// Values filed under one product name, by variable then date
    pub fn for_product(&self, product: &str) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(
            "SELECT product, variable, date, value, import_id FROM observation
             WHERE product = ?1 ORDER BY variable, date",
        )?;
        let rows = stmt.query_map(params![product], row_to_observation)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count_for(&self, product: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM observation WHERE product = ?1",
            params![product],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Re-file every row from one product name to another
    ///
    /// Where both names hold a value for the same variable and date, the
    /// moved row replaces the existing one.
    pub fn rename_product(&self, from: &str, to: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE OR REPLACE observation SET product = ?2 WHERE product = ?1",
            params![from, to],
        )?)
    }
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let date: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Observation {
        product: row.get(0)?,
        variable: row.get(1)?,
        date,
        value: row.get(3)?,
        import_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::schema::init_schema;

    fn obs(product: &str, day: u32, value: f64) -> Observation {
        Observation {
            product: product.to_string(),
            variable: "units".to_string(),
            date: NaiveDate::from_ymd_opt(2015, 1, day).unwrap(),
            value,
            import_id: None,
        }
    }

    #[test]
    fn test_record_and_rename() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let store = ObservationStore::new(&conn);

        store.record(&obs("TEMP-1", 1, 5.0)).unwrap();
        store.record(&obs("TEMP-1", 2, 6.0)).unwrap();
        store.record(&obs("Widget", 2, 1.0)).unwrap();

        assert_eq!(store.rename_product("TEMP-1", "Widget").unwrap(), 2);
        assert_eq!(store.count_for("TEMP-1").unwrap(), 0);

        let rows = store.for_product("Widget").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, 6.0);
    }
}
