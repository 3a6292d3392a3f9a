//! Run results.

use crate::catalog::IntrospectionFailure;
use crate::core::Table;
use crate::error::Result;
use crate::resolver::CyclicEdge;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one phase for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TableStatus {
    Ok,
    Skipped(String),
    Failed(String),
}

impl TableStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, TableStatus::Ok)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TableStatus::Failed(_))
    }
}

/// Per-table outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    /// Source name, `schema.table`.
    pub source: String,

    /// Target name, `schema_table`.
    pub target: String,

    pub ddl: TableStatus,
    pub data: TableStatus,

    /// Rows written to the target.
    pub rows: u64,
}

impl TableReport {
    pub(crate) fn new(table: &Table) -> Self {
        Self {
            source: table.full_name(),
            target: table.target_name(),
            ddl: TableStatus::Ok,
            data: TableStatus::Ok,
            rows: 0,
        }
    }

    /// Both the table and its data made it into the target.
    pub fn is_migrated(&self) -> bool {
        self.ddl.is_ok() && self.data.is_ok()
    }
}

/// Final status of a run that reached the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    pub status: RunStatus,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Output database file.
    pub target_path: PathBuf,

    /// Base tables listed by the source.
    pub tables_listed: usize,

    /// Tables created and filled without error.
    pub tables_migrated: usize,

    /// Tables that failed introspection, DDL, or data transfer.
    pub tables_failed: usize,

    pub rows_transferred: u64,

    /// Per-table outcomes in emission order.
    pub tables: Vec<TableReport>,

    pub introspection_failures: Vec<IntrospectionFailure>,

    pub cyclic_edges: Vec<CyclicEdge>,

    /// Rows reported by `PRAGMA foreign_key_check`, when the check ran.
    pub foreign_key_violations: Option<usize>,
}

impl MigrationReport {
    pub(crate) fn new(
        run_id: String,
        started_at: DateTime<Utc>,
        target_path: PathBuf,
        tables: Vec<TableReport>,
        introspection_failures: Vec<IntrospectionFailure>,
        cyclic_edges: Vec<CyclicEdge>,
        foreign_key_violations: Option<usize>,
    ) -> Self {
        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let tables_migrated = tables.iter().filter(|t| t.is_migrated()).count();
        let tables_failed = introspection_failures.len()
            + tables
                .iter()
                .filter(|t| t.ddl.is_failed() || t.data.is_failed())
                .count();
        let rows_transferred = tables.iter().map(|t| t.rows).sum();

        let status = if tables_failed > 0 {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };

        Self {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds,
            target_path,
            tables_listed: tables.len() + introspection_failures.len(),
            tables_migrated,
            tables_failed,
            rows_transferred,
            tables,
            introspection_failures,
            cyclic_edges,
            foreign_key_violations,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.status == RunStatus::CompletedWithErrors
    }

    /// Look up a table by its source name (`schema.table`).
    pub fn table(&self, source_name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.source == source_name)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Connectivity of both ends.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}
