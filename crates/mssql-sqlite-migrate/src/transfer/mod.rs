//! Row transfer from the source into the SQLite target.
//!
//! Each table is read in full through a [`Projection`], every value is
//! coerced to a SQLite value, and the rows are upserted with
//! `INSERT OR REPLACE` inside a savepoint so a failing table leaves no
//! partial rows behind.

mod coerce;
mod projection;

pub use coerce::{coerce_row, coerce_value};
pub use projection::{ProjectedColumn, Projection};

use crate::core::identifier::{quote_sqlite, quote_sqlite_list};
use crate::core::Table;
use crate::error::Result;
use crate::source::RowReader;
use rusqlite::{params_from_iter, Transaction};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Statistics from one table transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Time spent reading from the source.
    pub query_time: Duration,

    /// Time spent coercing and writing.
    pub write_time: Duration,

    /// Rows written.
    pub rows: u64,
}

/// Moves table data from a [`RowReader`] into an open target transaction.
pub struct DataTransferEngine<'a, R: RowReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: RowReader + ?Sized> DataTransferEngine<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Copy every row of `table` into its translated target table.
    ///
    /// An empty source table is a no-op. On error nothing from this table is
    /// left in the transaction.
    pub async fn transfer_table(
        &self,
        tx: &mut Transaction<'_>,
        table: &Table,
    ) -> Result<TransferStats> {
        let full_name = table.full_name();
        let projection = Projection::for_table(table);
        let mut stats = TransferStats::default();

        let query_start = Instant::now();
        let rows = self.reader.read_rows(&projection).await?;
        stats.query_time = query_start.elapsed();

        if rows.is_empty() {
            debug!("{}: no rows", full_name);
            return Ok(stats);
        }

        let write_start = Instant::now();
        let width = projection.columns.len();
        let values = rows
            .into_iter()
            .map(|row| coerce_row(&full_name, width, row))
            .collect::<Result<Vec<_>>>()?;

        let sql = insert_sql(table, &projection)?;
        debug!("{}", sql);

        let sp = tx.savepoint()?;
        {
            let mut stmt = sp.prepare(&sql)?;
            for row in &values {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        sp.commit()?;

        stats.write_time = write_start.elapsed();
        stats.rows = values.len() as u64;

        info!(
            "{}: {} rows (query {:?}, write {:?})",
            full_name, stats.rows, stats.query_time, stats.write_time
        );
        Ok(stats)
    }
}

/// `INSERT OR REPLACE INTO "schema_table" ("a", "b") VALUES (?, ?)`
fn insert_sql(table: &Table, projection: &Projection) -> Result<String> {
    let placeholders = vec!["?"; projection.columns.len()].join(", ");
    Ok(format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_sqlite(&table.target_name())?,
        quote_sqlite_list(&projection.column_names())?,
        placeholders
    ))
}
