//! Type mapping between MSSQL and SQLite storage classes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQLite storage class used in generated column definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqliteType {
    Integer,
    Real,
    Text,
}

impl SqliteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqliteType::Integer => "INTEGER",
            SqliteType::Real => "REAL",
            SqliteType::Text => "TEXT",
        }
    }
}

impl fmt::Display for SqliteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a column has to be selected from SQL Server so the driver can read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTransform {
    /// Select the column as-is.
    Raw,

    /// CLR types (spatial, hierarchyid): `[col].ToString()`.
    ToText,

    /// xml: `CAST([col] AS NVARCHAR(MAX))`.
    CastToText,
}

/// Map an MSSQL data type to a SQLite storage class.
///
/// Unknown types fall back to TEXT.
pub fn map_type(mssql_type: &str) -> SqliteType {
    match mssql_type.trim().to_lowercase().as_str() {
        // Integer types (bit included)
        "int" | "bigint" | "smallint" | "tinyint" | "bit" => SqliteType::Integer,

        // Decimal, money and floating point
        "decimal" | "numeric" | "money" | "smallmoney" | "float" | "real" => SqliteType::Real,

        // String and spatial types
        "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" => SqliteType::Text,
        "geography" | "geometry" => SqliteType::Text,

        // Date/time types are stored as ISO-8601 text
        "datetime" | "datetime2" | "smalldatetime" | "date" | "time" => SqliteType::Text,

        // Default fallback
        _ => SqliteType::Text,
    }
}

/// Check whether a type is one of the spatial types.
pub fn is_spatial(mssql_type: &str) -> bool {
    matches!(
        mssql_type.trim().to_lowercase().as_str(),
        "geography" | "geometry"
    )
}

/// Pick the read transform for a source column type.
pub fn read_transform(mssql_type: &str) -> ReadTransform {
    let lower = mssql_type.trim().to_lowercase();
    if is_spatial(&lower) || lower == "hierarchyid" {
        ReadTransform::ToText
    } else if lower == "xml" {
        ReadTransform::CastToText
    } else {
        ReadTransform::Raw
    }
}
