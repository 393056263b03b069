//! # stepwise-migrate: ordered SQL migrations with a ledger table
//!
//! Applies a directory of `NNNN_<name>.sql` files to a database exactly once
//! each, in strict numeric order. Progress is recorded in a ledger table
//! (`_migrations` by default), so repeated runs are idempotent and resume
//! where the previous run stopped.
//!
//! A run is a single transaction: either every outstanding migration is
//! applied and recorded, or nothing is.
//!
//! ```rust,ignore
//! use stepwise_migrate::{MigrationConfig, Migrator};
//!
//! let config = MigrationConfig::new("migrations");
//! let migrator = Migrator::connect("postgres://localhost/app", &config).await?;
//! for file in migrator.run().await? {
//!     println!("Applied {}", file);
//! }
//! ```

pub mod error;
pub mod migrations;
pub mod transaction;

pub use error::*;
pub use migrations::*;
pub use transaction::MigrationTransaction;
