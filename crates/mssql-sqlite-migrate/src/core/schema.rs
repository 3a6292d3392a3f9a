//! Table, column, and constraint descriptors captured from the source catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A source table identifier: `(schema, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// The flattened `schema_name` identifier used in the target store.
    pub fn translated(&self) -> String {
        format!("{}_{}", self.schema, self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Source data type (e.g., "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Default expression as reported by the catalog.
    pub default: Option<String>,

    /// Maximum character length (-1 for max).
    pub max_length: Option<i32>,
}

impl Column {
    /// Shorthand for a nullable column with no default or length.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
            max_length: None,
        }
    }

    /// Mark the column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }
}

/// Foreign key metadata, one entry per referencing column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local column name.
    pub column: String,

    /// Referenced table.
    pub ref_table: QualifiedName,

    /// Referenced column name.
    pub ref_column: String,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Qualified source identifier.
    pub name: QualifiedName,

    /// Column definitions in declaration order.
    pub columns: Vec<Column>,

    /// Primary key column names in key order.
    pub primary_key: Vec<String>,

    /// Unique constraints: constraint name to ordered column names.
    pub unique_constraints: BTreeMap<String, Vec<String>>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: QualifiedName, columns: Vec<Column>) -> Self {
        Self {
            name,
            columns,
            primary_key: Vec::new(),
            unique_constraints: BTreeMap::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        self.name.to_string()
    }

    /// Name of the table in the target store.
    pub fn target_name(&self) -> String {
        self.name.translated()
    }

    /// Check if the table has a single-column primary key.
    pub fn has_single_pk(&self) -> bool {
        self.primary_key.len() == 1
    }

    /// Check if the table has a primary key spanning several columns.
    pub fn has_composite_pk(&self) -> bool {
        self.primary_key.len() > 1
    }

    /// Check if a column is part of the primary key.
    pub fn is_pk_column(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }
}
