//! Error types for the migration runner
//!
//! Every failure surfaced by the crate is a [`MigrationError`]. Failures that
//! happen inside a run are wrapped in [`MigrationError::MigrationFailed`] so
//! callers see a single error for the whole run, while [`MigrationError::kind`]
//! still tells them what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Stable classification of a [`MigrationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidDirectory,
    InvalidTableName,
    UnsupportedDatabase,
    Connection,
    InvalidFilenameFormat,
    SequenceGap,
    ExecutionFailure,
    Io,
}

/// Error returned by the migration runner
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration directory `{}` does not exist or is not a directory", .path.display())]
    InvalidDirectory { path: PathBuf },

    #[error("Invalid ledger table name `{name}`")]
    InvalidTableName { name: String },

    #[error("Unsupported database scheme `{scheme}`, expected postgres, mysql or sqlite")]
    UnsupportedDatabase { scheme: String },

    #[error("Failed to connect to database: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration failed: {source}")]
    MigrationFailed {
        #[from]
        source: FailureCause,
    },
}

/// The original cause of a failed run
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("File must be in format `0000_Name.sql`, found `{file}`")]
    InvalidFilenameFormat { file: String },

    #[error("Next migration should start with `{expected}`, found `{file}`")]
    SequenceGap { expected: i64, file: String },

    #[error("Failed to {context}: {source}")]
    Execution {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FailureCause {
    /// Build an execution failure with a short description of the step
    pub fn execution(context: impl Into<String>, source: sqlx::Error) -> Self {
        FailureCause::Execution {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FailureCause::InvalidFilenameFormat { .. } => ErrorKind::InvalidFilenameFormat,
            FailureCause::SequenceGap { .. } => ErrorKind::SequenceGap,
            FailureCause::Execution { .. } => ErrorKind::ExecutionFailure,
            FailureCause::Io { .. } => ErrorKind::Io,
        }
    }
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::InvalidDirectory { .. } => ErrorKind::InvalidDirectory,
            MigrationError::InvalidTableName { .. } => ErrorKind::InvalidTableName,
            MigrationError::UnsupportedDatabase { .. } => ErrorKind::UnsupportedDatabase,
            MigrationError::Connection { .. } => ErrorKind::Connection,
            MigrationError::MigrationFailed { source } => source.kind(),
        }
    }

    /// The run failure this error wraps, if any
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            MigrationError::MigrationFailed { source } => Some(source),
            _ => None,
        }
    }

    /// Database-reported error code (SQLSTATE or engine specific), when the
    /// failure came from the database itself
    pub fn code(&self) -> Option<String> {
        let source = match self {
            MigrationError::Connection { source } => source,
            MigrationError::MigrationFailed {
                source: FailureCause::Execution { source, .. },
            } => source,
            _ => return None,
        };

        match source {
            sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
            _ => None,
        }
    }
}
