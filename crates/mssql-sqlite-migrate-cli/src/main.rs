//! mssql-sqlite-migrate CLI - MSSQL to SQLite schema and data migration.

mod wizard;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use mssql_sqlite_migrate::{
    health_check, spawn_migration, wait_for_migration, CompositePrimaryKeyMode, Config,
    ConnectionParams, MigrateError, MigrationReport, SourceConfig, TableStatus,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mssql-sqlite-migrate")]
#[command(about = "Migrate a SQL Server database into a single SQLite file")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate schema and data into the SQLite file
    Run {
        /// Server address: host, host,port or host:port
        #[arg(long)]
        server: Option<String>,

        /// Source database name
        #[arg(long)]
        database: Option<String>,

        /// SQL Server login
        #[arg(long)]
        user: Option<String>,

        /// SQL Server password
        #[arg(long, env = "MSSQL_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Output SQLite file [default: output.db]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Composite primary keys: omit or table-constraint
        #[arg(long)]
        composite_primary_keys: Option<CompositePrimaryKeyMode>,

        /// Never prompt for missing connection values
        #[arg(long)]
        no_prompt: bool,
    },

    /// Test database connections
    HealthCheck,

    /// Create or edit a configuration file interactively
    Init {
        /// Output path for configuration file [default: config.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing file without confirmation
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing config)
    if let Commands::Init { output, force } = cli.command {
        // No logging setup for wizard - keeps terminal clean for interactive prompts
        let output_path = output.unwrap_or_else(|| PathBuf::from("config.yaml"));
        wizard::run_wizard(&output_path, force)
            .await
            .map_err(|e| MigrateError::Config(e.to_string()))?;
        return Ok(());
    }

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above
        Commands::Run {
            server,
            database,
            user,
            password,
            output,
            composite_primary_keys,
            no_prompt,
        } => {
            let overrides = ConnectionParams {
                server: server.unwrap_or_default(),
                database: database.unwrap_or_default(),
                username: user.unwrap_or_default(),
                password: password.unwrap_or_default(),
            };

            let mut config = match cli.config {
                Some(ref path) => {
                    let mut config = Config::load(path)?;
                    info!("Loaded configuration from {:?}", path);
                    apply_connection_overrides(&mut config, &overrides)?;
                    config
                }
                None => {
                    let interactive = !no_prompt && std::io::stdin().is_terminal();
                    let params = collect_params(overrides, interactive)?;
                    Config::from_params(&params)?
                }
            };

            if let Some(path) = output {
                config.target.path = path;
            }
            if let Some(mode) = composite_primary_keys {
                config.migration.composite_primary_keys = mode;
            }
            config.validate()?;

            info!(
                "Migrating {}/{} into {}",
                config.source.address(),
                config.source.database,
                config.target.path.display()
            );

            let report = wait_for_migration(spawn_migration(config)).await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
        }

        Commands::HealthCheck => {
            let path = cli.config.unwrap_or_else(|| PathBuf::from("config.yaml"));
            let config = Config::load(&path)?;
            let result = health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (MSSQL): {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (SQLite {}): {} ({}ms)",
                    config.target.path.display(),
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

/// Fill in missing connection values, prompting when a terminal is attached.
fn collect_params(
    mut params: ConnectionParams,
    interactive: bool,
) -> Result<ConnectionParams, MigrateError> {
    let missing = params.server.trim().is_empty()
        || params.database.trim().is_empty()
        || params.username.trim().is_empty()
        || params.password.is_empty();

    if !missing {
        return Ok(params);
    }
    if !interactive {
        return Err(MigrateError::Config("All fields are required.".to_string()));
    }

    let prompt_err = |e: dialoguer::Error| MigrateError::Config(e.to_string());

    if params.server.trim().is_empty() {
        params.server = Input::new()
            .with_prompt("Server")
            .interact_text()
            .map_err(prompt_err)?;
    }
    if params.database.trim().is_empty() {
        params.database = Input::new()
            .with_prompt("Database")
            .interact_text()
            .map_err(prompt_err)?;
    }
    if params.username.trim().is_empty() {
        params.username = Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(prompt_err)?;
    }
    if params.password.is_empty() {
        params.password = Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(prompt_err)?;
    }

    Ok(params)
}

fn apply_connection_overrides(
    config: &mut Config,
    overrides: &ConnectionParams,
) -> Result<(), MigrateError> {
    if !overrides.server.trim().is_empty() {
        let (host, port) = SourceConfig::split_server(&overrides.server)?;
        config.source.host = host;
        config.source.port = port;
    }
    if !overrides.database.trim().is_empty() {
        config.source.database = overrides.database.trim().to_string();
    }
    if !overrides.username.trim().is_empty() {
        config.source.user = overrides.username.trim().to_string();
    }
    if !overrides.password.is_empty() {
        config.source.password = overrides.password.clone();
    }
    Ok(())
}

fn print_report(report: &MigrationReport) {
    if report.has_errors() {
        println!("\nMigration completed with errors.");
    } else {
        println!("\nMigration completed!");
    }
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!(
        "  Tables: {}/{}",
        report.tables_migrated, report.tables_listed
    );
    println!("  Rows: {}", report.rows_transferred);
    println!("  Output: {}", report.target_path.display());

    if !report.cyclic_edges.is_empty() {
        println!("  Cyclic foreign keys:");
        for edge in &report.cyclic_edges {
            println!("    {} -> {}", edge.from, edge.to);
        }
    }
    if let Some(n) = report.foreign_key_violations.filter(|&n| n > 0) {
        println!("  Foreign key violations: {}", n);
    }

    let failures: Vec<(String, String)> = report
        .introspection_failures
        .iter()
        .map(|f| (f.table.to_string(), f.message.clone()))
        .chain(report.tables.iter().filter_map(|t| match (&t.ddl, &t.data) {
            (TableStatus::Failed(msg), _) | (_, TableStatus::Failed(msg)) => {
                Some((t.source.clone(), msg.clone()))
            }
            _ => None,
        }))
        .collect();

    if !failures.is_empty() {
        println!("  Failed tables:");
        for (table, message) in failures {
            println!("    {}: {}", table, message);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    // RUST_LOG wins over --verbosity when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
