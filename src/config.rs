//! Configuration loading and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source warehouse configuration.
    pub source: SourceConfig,

    /// Export behavior configuration.
    #[serde(default)]
    pub export: ExportConfig,
}

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

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.source.host.is_empty() {
            return Err(ExportError::Config("source.host is required".into()));
        }
        if self.source.database.is_empty() {
            return Err(ExportError::Config("source.database is required".into()));
        }
        if self.source.user.is_empty() {
            return Err(ExportError::Config("source.user is required".into()));
        }
        match self.source.ssl_mode.as_str() {
            "disable" | "verify-ca" | "verify-full" => {}
            other => {
                return Err(ExportError::Config(format!(
                    "invalid source.ssl_mode '{}'. Valid options: disable, verify-ca, verify-full",
                    other
                )));
            }
        }
        if self.export.fetch_size == 0 {
            return Err(ExportError::Config(
                "export.fetch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Source warehouse (Redshift) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Warehouse host.
    pub host: String,

    /// Warehouse port (default: 5439).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized back out.
    #[serde(skip_serializing)]
    pub password: String,

    /// Source schema (default: "public").
    #[serde(default = "default_schema")]
    pub schema: String,

    /// SSL mode (default: "verify-full").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

/// Export behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Rows fetched per page when streaming table data.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Emit an explicit value for the synthesized primary key per row.
    #[serde(default)]
    pub with_pk: bool,

    /// Target schema override; defaults to the source schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fetch_size: default_fetch_size(),
            with_pk: false,
            target_schema: None,
        }
    }
}

fn default_port() -> u16 {
    5439
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_ssl_mode() -> String {
    "verify-full".to_string()
}

fn default_fetch_size() -> usize {
    10_000
}
