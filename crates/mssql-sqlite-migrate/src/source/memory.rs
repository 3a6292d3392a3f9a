//! In-memory source for tests and offline runs.

use super::{RowReader, SchemaIntrospector, Source};
use crate::core::{Column, ForeignKey, QualifiedName, SqlValue, Table};
use crate::error::{MigrateError, Result};
use crate::transfer::Projection;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

struct MemoryTable {
    table: Table,
    rows: Vec<Vec<SqlValue>>,
}

/// A source backed by table descriptors and rows held in memory.
///
/// Rows are stored in column declaration order. Failures can be injected per
/// table to exercise the isolation paths of a run.
#[derive(Default)]
pub struct MemorySource {
    tables: Vec<MemoryTable>,
    introspection_failures: HashSet<QualifiedName>,
    read_failures: HashSet<QualifiedName>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its rows. Tables are listed in insertion order.
    pub fn with_table(mut self, table: Table, rows: Vec<Vec<SqlValue>>) -> Self {
        self.tables.push(MemoryTable { table, rows });
        self
    }

    /// Make every catalog query for `name` fail. The table is still listed.
    pub fn fail_introspection(mut self, name: QualifiedName) -> Self {
        self.introspection_failures.insert(name);
        self
    }

    /// Make row reads for `name` fail.
    pub fn fail_reads(mut self, name: QualifiedName) -> Self {
        self.read_failures.insert(name);
        self
    }

    fn find(&self, name: &QualifiedName) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| &t.table.name == name)
            .ok_or_else(|| MigrateError::SchemaExtraction(format!("table {} not found", name)))
    }

    fn describe(&self, name: &QualifiedName) -> Result<&Table> {
        if self.introspection_failures.contains(name) {
            return Err(MigrateError::SchemaExtraction(format!(
                "catalog query failed for {}",
                name
            )));
        }
        Ok(&self.find(name)?.table)
    }
}

#[async_trait]
impl SchemaIntrospector for MemorySource {
    async fn list_tables(&self) -> Result<Vec<QualifiedName>> {
        Ok(self.tables.iter().map(|t| t.table.name.clone()).collect())
    }

    async fn list_columns(&self, table: &QualifiedName) -> Result<Vec<Column>> {
        Ok(self.describe(table)?.columns.clone())
    }

    async fn list_primary_key_columns(&self, table: &QualifiedName) -> Result<Vec<String>> {
        Ok(self.describe(table)?.primary_key.clone())
    }

    async fn list_unique_constraints(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.describe(table)?.unique_constraints.clone())
    }

    async fn list_foreign_keys(&self, table: &QualifiedName) -> Result<Vec<ForeignKey>> {
        Ok(self.describe(table)?.foreign_keys.clone())
    }
}

#[async_trait]
impl RowReader for MemorySource {
    async fn read_rows(&self, projection: &Projection) -> Result<Vec<Vec<SqlValue>>> {
        if self.read_failures.contains(&projection.table) {
            return Err(MigrateError::transfer(
                projection.table.to_string(),
                "read failed",
            ));
        }

        let stored = self.find(&projection.table)?;
        let indexes = projection
            .columns
            .iter()
            .map(|col| {
                stored
                    .table
                    .columns
                    .iter()
                    .position(|c| c.name == col.name)
                    .ok_or_else(|| {
                        MigrateError::transfer(
                            projection.table.to_string(),
                            format!("unknown column {}", col.name),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        // Short rows are passed through so arity checks downstream can see them.
        Ok(stored
            .rows
            .iter()
            .map(|row| {
                indexes
                    .iter()
                    .filter_map(|&i| row.get(i).cloned())
                    .collect()
            })
            .collect())
    }
}

#[async_trait]
impl Source for MemorySource {
    fn db_type(&self) -> &str {
        "memory"
    }

    async fn close(&self) {}
}
