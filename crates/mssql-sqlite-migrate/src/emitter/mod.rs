//! SQLite DDL generation.

use crate::catalog::MigrationCatalog;
use crate::config::CompositePrimaryKeyMode;
use crate::core::identifier::{quote_sqlite, quote_sqlite_list};
use crate::core::Table;
use crate::error::Result;
use crate::typemap::map_type;
use rusqlite::Connection;
use tracing::debug;

/// Generates and executes `CREATE TABLE` statements for catalog tables.
pub struct SchemaEmitter<'a> {
    catalog: &'a MigrationCatalog,
    composite_pk: CompositePrimaryKeyMode,
}

impl<'a> SchemaEmitter<'a> {
    pub fn new(catalog: &'a MigrationCatalog, composite_pk: CompositePrimaryKeyMode) -> Self {
        Self {
            catalog,
            composite_pk,
        }
    }

    /// Generate the `CREATE TABLE IF NOT EXISTS` statement for a table.
    ///
    /// Column lines come first, then the composite primary key clause (when
    /// enabled), unique constraints in constraint-name order, and foreign keys
    /// in catalog order.
    pub fn create_table_sql(&self, table: &Table) -> Result<String> {
        let mut lines = Vec::with_capacity(
            table.columns.len() + table.unique_constraints.len() + table.foreign_keys.len() + 1,
        );

        for col in &table.columns {
            let mut line = format!("{} {}", quote_sqlite(&col.name)?, map_type(&col.data_type));
            if table.has_single_pk() && table.is_pk_column(&col.name) {
                line.push_str(" PRIMARY KEY");
            }
            if !col.is_nullable && !table.is_pk_column(&col.name) {
                line.push_str(" NOT NULL");
            }
            lines.push(line);
        }

        if table.has_composite_pk() && self.composite_pk == CompositePrimaryKeyMode::TableConstraint
        {
            lines.push(format!(
                "PRIMARY KEY ({})",
                quote_sqlite_list(&table.primary_key)?
            ));
        }

        for columns in table.unique_constraints.values() {
            if columns.is_empty() {
                continue;
            }
            lines.push(format!("UNIQUE ({})", quote_sqlite_list(columns)?));
        }

        for fk in &table.foreign_keys {
            lines.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_sqlite(&fk.column)?,
                quote_sqlite(&self.catalog.reference_name(&fk.ref_table))?,
                quote_sqlite(&fk.ref_column)?
            ));
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            quote_sqlite(&table.target_name())?,
            lines.join(",\n    ")
        ))
    }

    /// Create one table on the given connection.
    pub fn emit_table(&self, conn: &Connection, table: &Table) -> Result<()> {
        let sql = self.create_table_sql(table)?;
        debug!("{}", sql);
        conn.execute_batch(&sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ForeignKey, QualifiedName};

    fn customers() -> Table {
        let mut t = Table::new(
            QualifiedName::new("dbo", "Customers"),
            vec![
                Column::new("Id", "int").not_null(),
                Column::new("Email", "nvarchar").not_null(),
                Column::new("Balance", "money"),
            ],
        );
        t.primary_key = vec!["Id".into()];
        t.unique_constraints
            .insert("UQ_Customers_Email".into(), vec!["Email".into()]);
        t
    }

    fn orders() -> Table {
        let mut t = Table::new(
            QualifiedName::new("dbo", "Orders"),
            vec![
                Column::new("Id", "int").not_null(),
                Column::new("CustomerId", "int").not_null(),
                Column::new("Placed", "datetime2"),
            ],
        );
        t.primary_key = vec!["Id".into()];
        t.foreign_keys.push(ForeignKey {
            column: "CustomerId".into(),
            ref_table: QualifiedName::new("dbo", "Customers"),
            ref_column: "Id".into(),
        });
        t
    }

    fn order_lines() -> Table {
        let mut t = Table::new(
            QualifiedName::new("sales", "OrderLines"),
            vec![
                Column::new("OrderId", "int").not_null(),
                Column::new("LineNo", "smallint").not_null(),
                Column::new("Qty", "decimal"),
            ],
        );
        t.primary_key = vec!["OrderId".into(), "LineNo".into()];
        t
    }

    #[test]
    fn test_single_pk_inline_and_unique() {
        let catalog = MigrationCatalog::from_tables(vec![customers()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        let sql = emitter.create_table_sql(&customers()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"dbo_Customers\" (\n    \
             \"Id\" INTEGER PRIMARY KEY,\n    \
             \"Email\" TEXT NOT NULL,\n    \
             \"Balance\" REAL,\n    \
             UNIQUE (\"Email\")\n)"
        );
    }

    #[test]
    fn test_foreign_key_uses_translated_name() {
        let catalog = MigrationCatalog::from_tables(vec![customers(), orders()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        let sql = emitter.create_table_sql(&orders()).unwrap();
        assert!(sql.contains(
            "FOREIGN KEY (\"CustomerId\") REFERENCES \"dbo_Customers\" (\"Id\")"
        ));
        assert!(sql.contains("\"Placed\" TEXT,"));
    }

    #[test]
    fn test_foreign_key_to_unknown_table_keeps_raw_name() {
        let catalog = MigrationCatalog::from_tables(vec![orders()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        let sql = emitter.create_table_sql(&orders()).unwrap();
        assert!(sql.contains("REFERENCES \"dbo.Customers\" (\"Id\")"));
    }

    #[test]
    fn test_composite_pk_omitted_by_default() {
        let catalog = MigrationCatalog::from_tables(vec![order_lines()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        let sql = emitter.create_table_sql(&order_lines()).unwrap();
        assert!(!sql.contains("PRIMARY KEY"));
        // pk columns never get NOT NULL, even when the key is not declared
        assert!(sql.contains("\"OrderId\" INTEGER,"));
        assert!(sql.contains("\"LineNo\" INTEGER,"));
    }

    #[test]
    fn test_composite_pk_table_constraint() {
        let catalog = MigrationCatalog::from_tables(vec![order_lines()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::TableConstraint);
        let sql = emitter.create_table_sql(&order_lines()).unwrap();
        assert!(sql.contains("PRIMARY KEY (\"OrderId\", \"LineNo\")"));
        assert!(!sql.contains("INTEGER PRIMARY KEY"));
    }

    #[test]
    fn test_emit_table_is_idempotent() {
        let catalog = MigrationCatalog::from_tables(vec![customers(), orders()]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF").unwrap();

        // Orders first: the forward reference is accepted with enforcement off.
        emitter.emit_table(&conn, &orders()).unwrap();
        emitter.emit_table(&conn, &customers()).unwrap();
        emitter.emit_table(&conn, &customers()).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let bad = Table::new(QualifiedName::new("dbo", "T"), vec![Column::new("", "int")]);
        let catalog = MigrationCatalog::from_tables(vec![]).unwrap();
        let emitter = SchemaEmitter::new(&catalog, CompositePrimaryKeyMode::Omit);
        assert!(emitter.create_table_sql(&bad).is_err());
    }
}
