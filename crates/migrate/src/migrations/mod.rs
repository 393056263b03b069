//! Migration System
//!
//! File discovery, sequencing, ledger SQL and the runner that ties them
//! together.

pub mod definitions;
pub mod dialect;
pub mod directory;
pub mod runner;
pub mod sequence;

pub use definitions::*;
pub use dialect::{validate_table_name, Dialect};
pub use directory::{parse_file_name, MigrationDirectory};
pub use runner::Migrator;
pub use sequence::plan;
