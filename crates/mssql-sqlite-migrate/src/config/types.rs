//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MSSQL).
    pub source: SourceConfig,

    /// Target store configuration (SQLite).
    #[serde(default)]
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// The four values a front end collects before starting a run.
#[derive(Clone, Default)]
pub struct ConnectionParams {
    /// Server address: `host`, `host,port` or `host:port`.
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Source database (MSSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Encrypt connection (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust server certificate (default: true).
    #[serde(default = "default_true")]
    pub trust_server_cert: bool,
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

/// Target store (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Path of the output database file (default: output.db).
    #[serde(default = "default_target_path")]
    pub path: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            path: default_target_path(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// How primary keys spanning more than one column are declared.
    #[serde(default)]
    pub composite_primary_keys: CompositePrimaryKeyMode,

    /// Run `PRAGMA foreign_key_check` once enforcement is re-enabled (default: true).
    #[serde(default = "default_true")]
    pub check_foreign_keys: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            composite_primary_keys: CompositePrimaryKeyMode::default(),
            check_foreign_keys: true,
        }
    }
}

/// Declaration strategy for multi-column primary keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositePrimaryKeyMode {
    /// Leave composite keys undeclared; the columns become ordinary columns.
    #[default]
    Omit,

    /// Declare a table-level `PRIMARY KEY (a, b, ...)` clause.
    TableConstraint,
}

impl std::str::FromStr for CompositePrimaryKeyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "omit" => Ok(Self::Omit),
            "table_constraint" => Ok(Self::TableConstraint),
            other => Err(format!(
                "unknown composite primary key mode '{}' (expected omit or table_constraint)",
                other
            )),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_mssql_port() -> u16 {
    1433
}

pub(crate) fn default_target_path() -> PathBuf {
    PathBuf::from("output.db")
}

fn default_true() -> bool {
    true
}
