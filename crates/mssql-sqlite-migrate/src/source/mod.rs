//! Source database access: catalog introspection and row reads.

mod memory;
mod mssql;

pub use memory::MemorySource;
pub use mssql::MssqlSource;

use crate::core::{Column, ForeignKey, QualifiedName, SqlValue};
use crate::error::Result;
use crate::transfer::Projection;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Catalog queries against the source database.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// List every base table. Failure here is fatal for the run.
    async fn list_tables(&self) -> Result<Vec<QualifiedName>>;

    /// Columns of a table in ordinal order.
    async fn list_columns(&self, table: &QualifiedName) -> Result<Vec<Column>>;

    /// Primary key column names in key order (empty if the table has none).
    async fn list_primary_key_columns(&self, table: &QualifiedName) -> Result<Vec<String>>;

    /// Unique constraints keyed by constraint name, columns in key order.
    async fn list_unique_constraints(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, Vec<String>>>;

    /// Foreign keys, one entry per referencing column.
    async fn list_foreign_keys(&self, table: &QualifiedName) -> Result<Vec<ForeignKey>>;
}

/// Reads the rows of one table through a projection.
#[async_trait]
pub trait RowReader: Send + Sync {
    /// Execute the projection and return every row.
    ///
    /// Each row holds one value per projected column, in projection order.
    async fn read_rows(&self, projection: &Projection) -> Result<Vec<Vec<SqlValue>>>;
}

/// A complete source: catalog plus data.
#[async_trait]
pub trait Source: SchemaIntrospector + RowReader {
    /// Short name of the backing engine, used in log lines.
    fn db_type(&self) -> &str;

    /// Release the underlying connection.
    async fn close(&self);
}
