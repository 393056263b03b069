//! Migration Definitions - Core types shared by the runner
//!
//! Defines migration files found on disk, ledger entries recorded in the
//! database, and the runner configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::FailureCause;

/// Default name of the ledger table
pub const DEFAULT_LEDGER_TABLE: &str = "_migrations";

/// A numbered SQL file in the migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Sequence number encoded in the first four digits of the file name
    pub number: u16,
    /// Descriptive part of the file name, between the number and `.sql`
    pub name: String,
    /// Full file name, as recorded in the ledger
    pub file_name: String,
    /// Location on disk
    pub path: PathBuf,
}

impl MigrationFile {
    /// Read the SQL body; done at application time only
    pub fn read_sql(&self) -> Result<String, FailureCause> {
        fs::read_to_string(&self.path).map_err(|source| FailureCause::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// A row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub number: i64,
    pub file: String,
    /// Application timestamp as rendered by the database
    pub created: String,
}

/// State of a single migration as reported by `Migrator::status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    /// File on disk, recorded in the ledger
    Applied {
        number: i64,
        file: String,
        created: String,
    },
    /// File on disk, not yet applied
    Pending { number: i64, file: String },
    /// Recorded in the ledger but no longer on disk
    Missing {
        number: i64,
        file: String,
        created: String,
    },
}

impl MigrationState {
    pub fn number(&self) -> i64 {
        match self {
            MigrationState::Applied { number, .. }
            | MigrationState::Pending { number, .. }
            | MigrationState::Missing { number, .. } => *number,
        }
    }

    pub fn file(&self) -> &str {
        match self {
            MigrationState::Applied { file, .. }
            | MigrationState::Pending { file, .. }
            | MigrationState::Missing { file, .. } => file,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MigrationState::Pending { .. })
    }
}

/// Configuration for the migration runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking applied migrations
    pub migrations_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl MigrationConfig {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }
}
