//! # mssql-sqlite-migrate
//!
//! MSSQL to SQLite schema and data migration library.
//!
//! A run copies every base table of a SQL Server database into a single
//! SQLite file:
//!
//! - **Introspection** of tables, columns, primary keys, unique constraints
//!   and foreign keys through `INFORMATION_SCHEMA`
//! - **Dependency ordering** so referenced tables are created first, with
//!   cycles reported instead of failing the run
//! - **Type mapping** onto SQLite's INTEGER, REAL and TEXT storage classes
//! - **Upserts** with `INSERT OR REPLACE`, so reruns converge on the same file
//! - **Per-table isolation**: one broken table never stops the others
//!
//! Tables are named `<schema>_<table>` in the target.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_sqlite_migrate::{run_migration, ConnectionParams};
//!
//! fn main() -> mssql_sqlite_migrate::Result<()> {
//!     let params = ConnectionParams {
//!         server: "sqlserver.local,1433".into(),
//!         database: "Sales".into(),
//!         username: "sa".into(),
//!         password: "secret".into(),
//!     };
//!     let report = run_migration(&params)?;
//!     println!("Migrated {} rows", report.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod core;
pub mod emitter;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod source;
pub mod target;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use catalog::{IntrospectionFailure, MigrationCatalog};
pub use config::{
    CompositePrimaryKeyMode, Config, ConnectionParams, MigrationConfig, SourceConfig,
    TargetConfig,
};
pub use crate::core::{Column, ForeignKey, QualifiedName, SqlValue, Table};
pub use emitter::SchemaEmitter;
pub use error::{MigrateError, Result};
pub use orchestrator::{
    health_check, run_migration, run_migration_with_config, spawn_migration,
    wait_for_migration, HealthCheckResult, MigrationReport, Orchestrator, RunStatus, TableReport,
    TableStatus,
};
pub use resolver::{resolve, CyclicEdge, ResolvedOrder};
pub use source::{MemorySource, MssqlSource, RowReader, SchemaIntrospector, Source};
pub use target::SqliteTarget;
pub use transfer::{DataTransferEngine, Projection, TransferStats};
pub use typemap::{map_type, SqliteType};
