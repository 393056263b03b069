//! SQL Dialects - Ledger SQL for each supported database
//!
//! The runner talks to the database through the sqlx `Any` driver, which does
//! not rewrite SQL. Everything that differs between backends (DDL, bind
//! placeholders, casts) is rendered here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MigrationError, MigrationResult};

static TABLE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("valid table name pattern")
});

/// Database backend the ledger lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL such as `postgres://...`
    pub fn from_url(url: &str) -> MigrationResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default().to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(MigrationError::UnsupportedDatabase { scheme }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Bind placeholder for the 1-based parameter `index`
    fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// SQL to create the ledger table if it does not exist yet
    pub fn create_ledger_table_sql(&self, table: &str) -> String {
        match self {
            Dialect::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id SERIAL PRIMARY KEY,\n    \
                    number INTEGER NOT NULL CHECK (number >= 0),\n    \
                    file VARCHAR(255) NOT NULL,\n    \
                    created TIMESTAMP NOT NULL,\n    \
                    UNIQUE (number)\n\
                )",
                table
            ),
            Dialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id INT UNSIGNED NOT NULL AUTO_INCREMENT,\n    \
                    number INT NOT NULL,\n    \
                    file VARCHAR(255) NOT NULL,\n    \
                    created DATETIME NOT NULL,\n    \
                    PRIMARY KEY (id),\n    \
                    UNIQUE (number)\n\
                ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                table
            ),
            Dialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
                    number INTEGER NOT NULL,\n    \
                    file VARCHAR(255) NOT NULL,\n    \
                    created TIMESTAMP NOT NULL,\n    \
                    UNIQUE (number)\n\
                )",
                table
            ),
        }
    }

    /// SQL to read the high-water mark, 0 for an empty ledger
    pub fn latest_number_sql(&self, table: &str) -> String {
        format!("SELECT COALESCE(MAX(number), 0) FROM {}", table)
    }

    /// SQL to record an applied migration; binds `number` then `file`
    pub fn record_migration_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {} (number, file, created) VALUES ({}, {}, CURRENT_TIMESTAMP)",
            table,
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    /// SQL to list ledger entries with `created` rendered as text
    pub fn applied_migrations_sql(&self, table: &str) -> String {
        let created = match self {
            Dialect::MySql => "CAST(created AS CHAR)",
            Dialect::Postgres | Dialect::Sqlite => "CAST(created AS TEXT)",
        };
        format!(
            "SELECT number, file, {} AS created FROM {} ORDER BY number",
            created, table
        )
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check that a ledger table name is safe to interpolate into SQL
pub fn validate_table_name(name: &str) -> MigrationResult<()> {
    if TABLE_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MigrationError::InvalidTableName {
            name: name.to_string(),
        })
    }
}
