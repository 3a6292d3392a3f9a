//! Interactive configuration wizard for creating/editing config files.

use dialoguer::{Confirm, Input, Password, Select};
use mssql_sqlite_migrate::{
    health_check, CompositePrimaryKeyMode, Config, MigrationConfig, SourceConfig, TargetConfig,
};
use std::path::{Path, PathBuf};

/// Result type for wizard operations.
pub type WizardResult<T> = Result<T, WizardError>;

/// Errors that can occur during wizard execution.
#[derive(Debug)]
pub enum WizardError {
    /// User cancelled the wizard.
    Cancelled,
    /// IO error (file read/write).
    Io(std::io::Error),
    /// Config serialization error.
    Config(String),
    /// Validation error.
    Validation(String),
}

impl std::fmt::Display for WizardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Configuration cancelled"),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<std::io::Error> for WizardError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<dialoguer::Error> for WizardError {
    fn from(e: dialoguer::Error) -> Self {
        Self::Io(std::io::Error::other(e.to_string()))
    }
}

/// Run the configuration wizard.
pub async fn run_wizard(output: &Path, force: bool) -> WizardResult<()> {
    println!();
    println!("MSSQL to SQLite Migration - Configuration Wizard");
    println!("================================================");
    println!();

    let existing = if output.exists() && !force {
        println!("File already exists: {}\n", output.display());
        let options = &["Edit existing configuration", "Overwrite with new", "Abort"];
        let selection = Select::new()
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact()?;

        match selection {
            0 => match Config::load(output) {
                Ok(config) => Some(config),
                Err(e) => {
                    println!("Warning: Could not parse existing file: {}", e);
                    println!("Starting with fresh configuration.\n");
                    None
                }
            },
            1 => None,
            _ => return Err(WizardError::Cancelled),
        }
    } else {
        None
    };

    let config = Config {
        source: prompt_source_config(existing.as_ref().map(|c| &c.source))?,
        target: prompt_target_config(existing.as_ref().map(|c| &c.target))?,
        migration: prompt_migration_config(existing.as_ref().map(|c| &c.migration))?,
    };

    if let Err(e) = config.validate() {
        return Err(WizardError::Validation(e.to_string()));
    }

    print_summary(&config);

    if Confirm::new()
        .with_prompt("Test connections?")
        .default(false)
        .interact()?
    {
        test_connections(&config).await;
    }

    if !Confirm::new()
        .with_prompt(format!("Save to {}?", output.display()))
        .default(true)
        .interact()?
    {
        return Err(WizardError::Cancelled);
    }

    write_config(&config, output)?;

    println!("\nConfiguration saved to {}", output.display());
    println!(
        "Run 'mssql-sqlite-migrate --config {} run' to start the migration.",
        output.display()
    );

    Ok(())
}

fn prompt_source_config(existing: Option<&SourceConfig>) -> WizardResult<SourceConfig> {
    println!("Source Database (MSSQL)");
    println!("-----------------------");

    let host: String = Input::new()
        .with_prompt("  Host")
        .default(existing.map(|c| c.host.clone()).unwrap_or_default())
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("  Port")
        .default(existing.map(|c| c.port).unwrap_or(1433))
        .interact_text()?;

    let database: String = Input::new()
        .with_prompt("  Database")
        .default(existing.map(|c| c.database.clone()).unwrap_or_default())
        .interact_text()?;

    let user: String = Input::new()
        .with_prompt("  User")
        .default(existing.map(|c| c.user.clone()).unwrap_or_default())
        .interact_text()?;

    let password = match existing {
        Some(c) => {
            let input: String = Password::new()
                .with_prompt("  Password (blank to keep existing)")
                .allow_empty_password(true)
                .interact()?;
            if input.is_empty() {
                c.password.clone()
            } else {
                input
            }
        }
        None => Password::new().with_prompt("  Password").interact()?,
    };

    let encrypt = Confirm::new()
        .with_prompt("  Encrypt connection")
        .default(existing.map(|c| c.encrypt).unwrap_or(false))
        .interact()?;

    let trust_server_cert = Confirm::new()
        .with_prompt("  Trust server certificate")
        .default(existing.map(|c| c.trust_server_cert).unwrap_or(true))
        .interact()?;

    println!();

    Ok(SourceConfig {
        host,
        port,
        database,
        user,
        password,
        encrypt,
        trust_server_cert,
    })
}

fn prompt_target_config(existing: Option<&TargetConfig>) -> WizardResult<TargetConfig> {
    println!("Target (SQLite)");
    println!("---------------");

    let default_path = existing
        .map(|c| c.path.display().to_string())
        .unwrap_or_else(|| "output.db".to_string());
    let path: String = Input::new()
        .with_prompt("  Output file")
        .default(default_path)
        .interact_text()?;

    println!();

    Ok(TargetConfig {
        path: PathBuf::from(path),
    })
}

fn prompt_migration_config(existing: Option<&MigrationConfig>) -> WizardResult<MigrationConfig> {
    println!("Migration Options");
    println!("-----------------");

    let current = existing.map(|c| c.composite_primary_keys).unwrap_or_default();
    let modes = &[
        "Omit composite primary keys",
        "Declare composite primary keys as table constraints",
    ];
    let mode_idx = Select::new()
        .with_prompt("  Composite primary keys")
        .items(modes)
        .default(match current {
            CompositePrimaryKeyMode::Omit => 0,
            CompositePrimaryKeyMode::TableConstraint => 1,
        })
        .interact()?;
    let composite_primary_keys = if mode_idx == 1 {
        CompositePrimaryKeyMode::TableConstraint
    } else {
        CompositePrimaryKeyMode::Omit
    };

    let check_foreign_keys = Confirm::new()
        .with_prompt("  Check foreign keys after load")
        .default(existing.map(|c| c.check_foreign_keys).unwrap_or(true))
        .interact()?;

    println!();

    Ok(MigrationConfig {
        composite_primary_keys,
        check_foreign_keys,
    })
}

fn print_summary(config: &Config) {
    println!("Configuration Summary");
    println!("---------------------");
    println!(
        "  Source: {}@{}/{}",
        config.source.user,
        config.source.address(),
        config.source.database
    );
    println!("  Target: {}", config.target.path.display());
    println!(
        "  Composite primary keys: {:?}",
        config.migration.composite_primary_keys
    );
    println!(
        "  Foreign key check: {}",
        if config.migration.check_foreign_keys { "yes" } else { "no" }
    );
    println!();
}

async fn test_connections(config: &Config) {
    use std::time::Duration;
    use tokio::time::timeout;

    println!("\nTesting connections...");

    // Use a 30-second timeout to prevent hanging indefinitely
    let health = match timeout(Duration::from_secs(30), health_check(config)).await {
        Ok(health) => health,
        Err(_) => {
            println!("  Health check timed out after 30 seconds");
            println!();
            return;
        }
    };

    println!(
        "  Source (MSSQL): {} ({}ms)",
        if health.source_connected { "OK" } else { "FAILED" },
        health.source_latency_ms
    );
    if let Some(ref err) = health.source_error {
        println!("    Error: {}", err);
    }

    println!(
        "  Target (SQLite): {} ({}ms)",
        if health.target_connected { "OK" } else { "FAILED" },
        health.target_latency_ms
    );
    if let Some(ref err) = health.target_error {
        println!("    Error: {}", err);
    }

    if !health.healthy {
        println!("\n  Warning: One or more connections failed.");
    }

    println!();
}

fn write_config(config: &Config, path: &Path) -> WizardResult<()> {
    let header = "# MSSQL to SQLite Migration Configuration\n# Generated by mssql-sqlite-migrate init\n\n";

    let yaml = serde_yaml::to_string(config).map_err(|e| WizardError::Config(e.to_string()))?;

    std::fs::write(path, format!("{}{}", header, yaml))?;

    Ok(())
}
