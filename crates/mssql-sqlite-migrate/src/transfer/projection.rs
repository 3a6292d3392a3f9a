//! Column projection used to read a table from the source.

use crate::core::identifier::{qualify_mssql, quote_mssql};
use crate::core::{QualifiedName, Table};
use crate::error::Result;
use crate::typemap::{read_transform, ReadTransform};

/// One selected column.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedColumn {
    /// Column name, preserved verbatim in the target.
    pub name: String,

    /// Declared source type.
    pub data_type: String,

    /// How the column is selected.
    pub transform: ReadTransform,
}

impl ProjectedColumn {
    /// The type the driver sees after the transform is applied.
    pub fn read_type(&self) -> &str {
        match self.transform {
            ReadTransform::Raw => &self.data_type,
            ReadTransform::ToText | ReadTransform::CastToText => "nvarchar",
        }
    }

    fn select_expr(&self) -> Result<String> {
        let quoted = quote_mssql(&self.name)?;
        Ok(match self.transform {
            ReadTransform::Raw => quoted,
            ReadTransform::ToText => format!("{}.ToString() AS {}", quoted, quoted),
            ReadTransform::CastToText => format!("CAST({} AS NVARCHAR(MAX)) AS {}", quoted, quoted),
        })
    }
}

/// All declared columns of a table, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub table: QualifiedName,
    pub columns: Vec<ProjectedColumn>,
}

impl Projection {
    pub fn for_table(table: &Table) -> Self {
        let columns = table
            .columns
            .iter()
            .map(|c| ProjectedColumn {
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                transform: read_transform(&c.data_type),
            })
            .collect();

        Self {
            table: table.name.clone(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Build the `SELECT` statement for SQL Server.
    pub fn to_mssql_select(&self) -> Result<String> {
        let exprs = self
            .columns
            .iter()
            .map(ProjectedColumn::select_expr)
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "SELECT {} FROM {}",
            exprs.join(", "),
            qualify_mssql(&self.table.schema, &self.table.name)?
        ))
    }
}
