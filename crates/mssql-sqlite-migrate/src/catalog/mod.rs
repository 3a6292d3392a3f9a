//! The migration catalog: every introspected table plus the name map.
//!
//! Built once at the start of a run and read-only afterwards.

use crate::core::identifier::validate_identifier;
use crate::core::{QualifiedName, Table};
use crate::error::{MigrateError, Result};
use crate::source::SchemaIntrospector;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// A listed table that could not be added to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntrospectionFailure {
    pub table: QualifiedName,
    pub message: String,
}

/// Tables in source listing order and the qualified-to-translated name map.
#[derive(Debug, Clone, Default)]
pub struct MigrationCatalog {
    tables: Vec<Table>,
    index: HashMap<QualifiedName, usize>,
    name_map: BTreeMap<QualifiedName, String>,
}

impl MigrationCatalog {
    /// Introspect every base table of the source.
    ///
    /// Listing failure is fatal. Any other failure only drops the affected
    /// table, which is returned as an [`IntrospectionFailure`].
    pub async fn introspect<S>(source: &S) -> Result<(Self, Vec<IntrospectionFailure>)>
    where
        S: SchemaIntrospector + ?Sized,
    {
        let listed = source.list_tables().await?;
        info!("Introspecting {} tables", listed.len());

        let mut catalog = Self {
            name_map: listed
                .iter()
                .map(|n| (n.clone(), n.translated()))
                .collect(),
            ..Self::default()
        };
        let mut failures = Vec::new();

        for name in listed {
            let result = match describe_table(source, &name).await {
                Ok(table) => catalog.insert(table),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                warn!("Skipping {}: {}", name, e);
                failures.push(IntrospectionFailure {
                    table: name,
                    message: e.to_string(),
                });
            }
        }

        info!(
            "Catalog ready: {} tables, {} introspection failures",
            catalog.tables.len(),
            failures.len()
        );
        Ok((catalog, failures))
    }

    /// Build a catalog from descriptors that are already known.
    pub fn from_tables(tables: Vec<Table>) -> Result<Self> {
        let mut catalog = Self::default();
        for table in tables {
            catalog
                .name_map
                .insert(table.name.clone(), table.target_name());
            catalog.insert(table)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, table: Table) -> Result<()> {
        let translated = table.target_name();
        if let Some(existing) = self.tables.iter().find(|t| t.target_name() == translated) {
            return Err(MigrateError::SchemaExtraction(format!(
                "{} and {} both translate to {}",
                existing.name, table.name, translated
            )));
        }

        self.index.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Tables in source listing order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn get(&self, name: &QualifiedName) -> Option<&Table> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Name to use when another table references `name`.
    ///
    /// Listed tables resolve to their translated name even when their own
    /// introspection failed; unknown tables keep the raw `schema.name`.
    pub fn reference_name(&self, name: &QualifiedName) -> String {
        self.name_map
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

async fn describe_table<S>(source: &S, name: &QualifiedName) -> Result<Table>
where
    S: SchemaIntrospector + ?Sized,
{
    validate_identifier(&name.schema)?;
    validate_identifier(&name.name)?;

    let columns = source.list_columns(name).await?;
    for col in &columns {
        validate_identifier(&col.name)?;
    }

    let mut table = Table::new(name.clone(), columns);
    table.primary_key = source.list_primary_key_columns(name).await?;
    table.unique_constraints = source.list_unique_constraints(name).await?;
    table.foreign_keys = source.list_foreign_keys(name).await?;

    debug!(
        "{}: {} columns, {} pk columns, {} unique constraints, {} foreign keys",
        name,
        table.columns.len(),
        table.primary_key.len(),
        table.unique_constraints.len(),
        table.foreign_keys.len()
    );
    Ok(table)
}
