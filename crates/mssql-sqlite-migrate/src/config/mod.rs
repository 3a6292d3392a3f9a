//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from the four front-end parameters, with defaults
    /// for everything else (target file `output.db`).
    pub fn from_params(params: &ConnectionParams) -> Result<Self> {
        let (host, port) = SourceConfig::split_server(&params.server)?;
        let config = Config {
            source: SourceConfig {
                host,
                port,
                database: params.database.trim().to_string(),
                user: params.username.trim().to_string(),
                password: params.password.clone(),
                encrypt: false,
                trust_server_cert: true,
            },
            target: TargetConfig::default(),
            migration: MigrationConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Serialize the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl SourceConfig {
    /// Split a server address into host and port.
    ///
    /// Accepts `host`, `host,port` (the SQL Server convention) and `host:port`.
    pub fn split_server(server: &str) -> Result<(String, u16)> {
        let server = server.trim();
        let split = server
            .rsplit_once(',')
            .or_else(|| server.rsplit_once(':').filter(|(h, _)| !h.contains(':')));

        match split {
            Some((host, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    MigrateError::Config(format!("invalid port in server address '{}'", server))
                })?;
                Ok((host.trim().to_string(), port))
            }
            None => Ok((server.to_string(), types::default_mssql_port())),
        }
    }

    /// Server address as `host,port` for display.
    pub fn address(&self) -> String {
        format!("{},{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(server: &str) -> ConnectionParams {
        ConnectionParams {
            server: server.to_string(),
            database: "Sales".to_string(),
            username: "sa".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_split_server_variants() {
        assert_eq!(
            SourceConfig::split_server("db.local").unwrap(),
            ("db.local".to_string(), 1433)
        );
        assert_eq!(
            SourceConfig::split_server("db.local,14330").unwrap(),
            ("db.local".to_string(), 14330)
        );
        assert_eq!(
            SourceConfig::split_server("10.0.0.5:1500").unwrap(),
            ("10.0.0.5".to_string(), 1500)
        );
        assert!(SourceConfig::split_server("db.local,abc").is_err());
    }

    #[test]
    fn test_from_params_uses_defaults() {
        let config = Config::from_params(&params("db.local")).unwrap();
        assert_eq!(config.source.port, 1433);
        assert_eq!(config.target.path, std::path::PathBuf::from("output.db"));
        assert_eq!(
            config.migration.composite_primary_keys,
            CompositePrimaryKeyMode::Omit
        );
        assert!(config.migration.check_foreign_keys);
    }

    #[test]
    fn test_from_params_requires_all_fields() {
        let mut p = params("db.local");
        p.username = String::new();
        assert!(matches!(
            Config::from_params(&p),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_from_yaml_defaults() {
        let yaml = r#"
source:
  host: sqlserver
  database: Sales
  user: sa
  password: secret
migration:
  composite_primary_keys: table_constraint
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.port, 1433);
        assert!(!config.source.encrypt);
        assert!(config.source.trust_server_cert);
        assert_eq!(config.target.path, std::path::PathBuf::from("output.db"));
        assert_eq!(
            config.migration.composite_primary_keys,
            CompositePrimaryKeyMode::TableConstraint
        );
    }

    #[test]
    fn test_params_debug_redacts_password() {
        let mut p = params("db.local");
        p.password = "hunter2".to_string();
        let debug_output = format!("{:?}", p);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_composite_mode_from_str() {
        assert_eq!(
            "table-constraint".parse::<CompositePrimaryKeyMode>().unwrap(),
            CompositePrimaryKeyMode::TableConstraint
        );
        assert!("inline".parse::<CompositePrimaryKeyMode>().is_err());
    }
}
