use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use stepwise_migrate::{MigrationConfig, DEFAULT_LEDGER_TABLE};
use thiserror::Error;

/// Project configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "stepwise.yaml";

pub const ENV_MIGRATIONS_DIR: &str = "STEPWISE_MIGRATIONS_DIR";
pub const ENV_MIGRATIONS_TABLE: &str = "STEPWISE_MIGRATIONS_TABLE";
pub const ENV_LOG_LEVEL: &str = "STEPWISE_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file `{}` not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepwiseConfig {
    pub database: DatabaseConfig,
    pub migrations: MigrationsConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL
    pub url_env: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub dir: String,
    pub table: String,
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub dir: Option<String>,
    pub table: Option<String>,
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            migrations: MigrationsConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "DATABASE_URL".to_string(),
            url: None,
        }
    }
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: "migrations".to_string(),
            table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl StepwiseConfig {
    /// Load the configuration file.
    ///
    /// An explicit `path` must exist. Without one, `stepwise.yaml` is used
    /// when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| env::var(name).ok());
    }

    /// Apply overrides from an environment lookup function
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(&self.database.url_env) {
            self.database.url = Some(url);
        }
        if let Some(dir) = non_empty(ENV_MIGRATIONS_DIR) {
            self.migrations.dir = dir;
        }
        if let Some(table) = non_empty(ENV_MIGRATIONS_TABLE) {
            self.migrations.table = table;
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.database_url {
            self.database.url = Some(url.clone());
        }
        if let Some(dir) = &overrides.dir {
            self.migrations.dir = dir.clone();
        }
        if let Some(table) = &overrides.table {
            self.migrations.table = table.clone();
        }
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "database.url".to_string(),
                hint: format!(
                    "Set the {} environment variable or pass --database-url",
                    self.database.url_env
                ),
            })
    }

    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig::new(&self.migrations.dir).with_table(&self.migrations.table)
    }
}
