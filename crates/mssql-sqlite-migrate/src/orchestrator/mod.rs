//! Migration orchestrator - main workflow coordinator.

mod report;

pub use report::{HealthCheckResult, MigrationReport, RunStatus, TableReport, TableStatus};

use crate::catalog::MigrationCatalog;
use crate::config::{Config, ConnectionParams};
use crate::emitter::SchemaEmitter;
use crate::error::{MigrateError, Result};
use crate::resolver::resolve;
use crate::source::{MssqlSource, Source};
use crate::target::SqliteTarget;
use crate::transfer::DataTransferEngine;
use chrono::Utc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Runs one migration over a single source/target connection pair.
pub struct Orchestrator {
    config: Config,
    source: Box<dyn Source>,
    target: SqliteTarget,
}

impl Orchestrator {
    /// Connect to SQL Server and open the target file.
    pub async fn connect(config: Config) -> Result<Self> {
        let source = MssqlSource::connect(&config.source).await?;
        Self::with_source(config, Box::new(source))
    }

    /// Use an already constructed source; the target file is opened from config.
    pub fn with_source(config: Config, source: Box<dyn Source>) -> Result<Self> {
        let target = SqliteTarget::open(&config.target.path)?;
        Ok(Self {
            config,
            source,
            target,
        })
    }

    /// Run the migration.
    ///
    /// Only connection-level problems are returned as errors. Per-table
    /// failures are logged and recorded in the report.
    pub async fn run(mut self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting migration run: {} ({} -> {})",
            run_id,
            self.source.db_type(),
            self.target.path().display()
        );

        self.target.set_foreign_keys(false)?;

        info!("Phase 1: Introspecting source catalog");
        let (catalog, introspection_failures) =
            MigrationCatalog::introspect(self.source.as_ref()).await?;

        info!("Phase 2: Resolving foreign key order");
        let order = resolve(&catalog);

        let mut reports: Vec<TableReport> = order.tables.iter().map(|t| TableReport::new(t)).collect();

        {
            let mut tx = self.target.transaction()?;

            info!("Phase 3: Creating {} tables", order.tables.len());
            let emitter =
                SchemaEmitter::new(&catalog, self.config.migration.composite_primary_keys);
            for (table, report) in order.tables.iter().zip(reports.iter_mut()) {
                if let Err(e) = emitter.emit_table(&tx, table) {
                    warn!("Failed to create {}: {}", report.target, e);
                    report.ddl = TableStatus::Failed(e.to_string());
                }
            }

            info!("Phase 4: Transferring data");
            let engine = DataTransferEngine::new(self.source.as_ref());
            for (table, report) in order.tables.iter().zip(reports.iter_mut()) {
                if !report.ddl.is_ok() {
                    report.data = TableStatus::Skipped("table was not created".to_string());
                    continue;
                }
                match engine.transfer_table(&mut tx, table).await {
                    Ok(stats) => report.rows = stats.rows,
                    Err(e) => {
                        warn!("Failed to transfer {}: {}", report.source, e);
                        report.data = TableStatus::Failed(e.to_string());
                    }
                }
            }

            tx.commit()?;
        }

        // Enforcement can only change outside a transaction.
        self.target.set_foreign_keys(true)?;

        let foreign_key_violations = if self.config.migration.check_foreign_keys {
            match self.target.foreign_key_violations() {
                Ok(0) => Some(0),
                Ok(n) => {
                    warn!("{} rows violate foreign keys after load", n);
                    Some(n)
                }
                Err(e) => {
                    warn!("Foreign key check failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let cyclic_edges = order.cyclic_edges;
        self.source.close().await;
        let target_path = self.target.path().to_path_buf();
        self.target.close()?;

        let report = MigrationReport::new(
            run_id,
            started_at,
            target_path,
            reports,
            introspection_failures,
            cyclic_edges,
            foreign_key_violations,
        );

        info!(
            "Migration {:?}: {}/{} tables, {} rows in {:.1}s",
            report.status,
            report.tables_migrated,
            report.tables_listed,
            report.rows_transferred,
            report.duration_seconds
        );

        Ok(report)
    }
}

/// Run a migration with default settings and block until it finishes.
///
/// The target is `output.db` in the working directory.
pub fn run_migration(params: &ConnectionParams) -> Result<MigrationReport> {
    run_migration_with_config(Config::from_params(params)?)
}

/// Run a migration with an explicit configuration and block until it finishes.
pub fn run_migration_with_config(config: Config) -> Result<MigrationReport> {
    config.validate()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move { Orchestrator::connect(config).await?.run().await })
}

/// Run a migration on a dedicated worker thread.
///
/// The receiver resolves once with the result. If the worker dies without
/// reporting, the sender is dropped and the receiver yields an error.
pub fn spawn_migration(config: Config) -> oneshot::Receiver<Result<MigrationReport>> {
    let (tx, rx) = oneshot::channel();

    let spawned = std::thread::Builder::new()
        .name("migration-worker".to_string())
        .spawn(move || {
            let result = run_migration_with_config(config);
            if tx.send(result).is_err() {
                warn!("Migration finished but nobody is waiting for the result");
            }
        });

    if let Err(e) = spawned {
        error!("Failed to start migration worker: {}", e);
    }

    rx
}

/// Wait on a receiver from [`spawn_migration`].
pub async fn wait_for_migration(
    rx: oneshot::Receiver<Result<MigrationReport>>,
) -> Result<MigrationReport> {
    rx.await
        .map_err(|_| MigrateError::Worker("worker exited without a result".to_string()))?
}

/// Check that both ends are reachable. The target file is never created.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let start = Instant::now();
    let source = MssqlSource::connect(&config.source).await;
    let source_latency_ms = start.elapsed().as_millis() as u64;
    let source_error = match source {
        Ok(source) => {
            source.close().await;
            None
        }
        Err(e) => Some(e.to_string()),
    };

    let start = Instant::now();
    let target_error = match SqliteTarget::check_writable(&config.target.path) {
        Ok(()) => None,
        Err(e) => Some(e.to_string()),
    };
    let target_latency_ms = start.elapsed().as_millis() as u64;

    HealthCheckResult {
        source_connected: source_error.is_none(),
        source_latency_ms,
        target_connected: target_error.is_none(),
        target_latency_ms,
        healthy: source_error.is_none() && target_error.is_none(),
        source_error,
        target_error,
    }
}
