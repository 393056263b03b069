//! Sequencing of outstanding migrations against the ledger high-water mark

use super::definitions::MigrationFile;
use crate::error::FailureCause;

/// Select the files that still need to run, in order.
///
/// `files` must already be sorted by number. Files at or below `latest` are
/// treated as applied. Every other file has to continue the sequence exactly,
/// so both gaps and repeated numbers fail with [`FailureCause::SequenceGap`].
pub fn plan(files: &[MigrationFile], latest: i64) -> Result<Vec<&MigrationFile>, FailureCause> {
    let mut from = latest;
    let mut pending = Vec::new();

    for file in files {
        let number = i64::from(file.number);
        if number <= latest {
            tracing::debug!("Skipping already applied migration {}", file.file_name);
            continue;
        }

        if number != from + 1 {
            return Err(FailureCause::SequenceGap {
                expected: from + 1,
                file: file.file_name.clone(),
            });
        }

        from = number;
        pending.push(file);
    }

    Ok(pending)
}
