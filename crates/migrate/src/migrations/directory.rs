//! Migration Directory - File system side of the runner
//!
//! Validates the configured directory and turns its entries into
//! [`MigrationFile`] values ordered by sequence number.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::MigrationFile;
use crate::error::{FailureCause, MigrationError, MigrationResult};

static FILE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{4})_(.+)\.sql$").expect("valid migration file pattern"));

/// A directory of `NNNN_<name>.sql` files
#[derive(Debug, Clone)]
pub struct MigrationDirectory {
    path: PathBuf,
}

impl MigrationDirectory {
    /// Open a migration directory, failing if the path is missing or not a directory
    pub fn open(path: impl Into<PathBuf>) -> MigrationResult<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(MigrationError::InvalidDirectory { path });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List every entry of the directory as a migration file, sorted by number.
    ///
    /// Any entry whose name does not follow `0000_Name.sql` aborts the scan,
    /// including entries that would otherwise count as already applied.
    pub fn scan(&self) -> Result<Vec<MigrationFile>, FailureCause> {
        let entries = fs::read_dir(&self.path).map_err(|source| FailureCause::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| FailureCause::Io {
                path: self.path.clone(),
                source,
            })?;

            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    return Err(FailureCause::InvalidFilenameFormat {
                        file: raw.to_string_lossy().into_owned(),
                    })
                }
            };

            let (number, name) = parse_file_name(&file_name)?;
            files.push(MigrationFile {
                number,
                name,
                path: entry.path(),
                file_name,
            });
        }

        files.sort_by(|a, b| {
            a.number
                .cmp(&b.number)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(files)
    }
}

/// Split `0001_create_users.sql` into `(1, "create_users")`
pub fn parse_file_name(file_name: &str) -> Result<(u16, String), FailureCause> {
    let invalid = || FailureCause::InvalidFilenameFormat {
        file: file_name.to_string(),
    };

    let captures = FILE_NAME_PATTERN.captures(file_name).ok_or_else(invalid)?;
    let number = captures[1].parse::<u16>().map_err(|_| invalid())?;
    Ok((number, captures[2].to_string()))
}
