//! Migration Runner - Applies outstanding migrations against the database
//!
//! A run opens one transaction, makes sure the ledger table exists, reads the
//! high-water mark, applies every outstanding file in order and records each
//! one in the ledger. Any failure rolls the whole run back.

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, Row};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::definitions::{LedgerEntry, MigrationConfig, MigrationState, DEFAULT_LEDGER_TABLE};
use super::dialect::{validate_table_name, Dialect};
use super::directory::MigrationDirectory;
use super::sequence::plan;
use crate::transaction::MigrationTransaction;
use crate::error::{FailureCause, MigrationError, MigrationResult};

/// Applies a directory of numbered SQL files to one database
pub struct Migrator {
    pool: AnyPool,
    dialect: Dialect,
    directory: MigrationDirectory,
    table: String,
}

impl Migrator {
    /// Create a runner over an existing pool.
    ///
    /// Fails with `InvalidDirectory` when `migrations_dir` is not a directory,
    /// and with `InvalidTableName` when `table` is not a plain identifier.
    /// The ledger table defaults to `_migrations`.
    pub fn new(
        pool: AnyPool,
        dialect: Dialect,
        migrations_dir: impl Into<PathBuf>,
        table: Option<&str>,
    ) -> MigrationResult<Self> {
        let directory = MigrationDirectory::open(migrations_dir)?;
        let table = table.unwrap_or(DEFAULT_LEDGER_TABLE).to_string();
        validate_table_name(&table)?;

        Ok(Self {
            pool,
            dialect,
            directory,
            table,
        })
    }

    /// Create a runner from a [`MigrationConfig`]
    pub fn from_config(
        pool: AnyPool,
        dialect: Dialect,
        config: &MigrationConfig,
    ) -> MigrationResult<Self> {
        Self::new(
            pool,
            dialect,
            config.migrations_dir.clone(),
            Some(&config.migrations_table),
        )
    }

    /// Connect to `database_url` and create a runner for it
    pub async fn connect(database_url: &str, config: &MigrationConfig) -> MigrationResult<Self> {
        let dialect = Dialect::from_url(database_url)?;
        // Validate local state before touching the network
        MigrationDirectory::open(config.migrations_dir.clone())?;
        validate_table_name(&config.migrations_table)?;

        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|source| MigrationError::Connection { source })?;

        debug!("Connected to {} database", dialect);
        Self::from_config(pool, dialect, config)
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn migrations_dir(&self) -> &Path {
        self.directory.path()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Apply every outstanding migration.
    ///
    /// Returns the file names applied by this call, in order; empty when the
    /// database is already up to date.
    pub async fn run(&self) -> MigrationResult<Vec<String>> {
        let start_time = Instant::now();
        let mut tx = MigrationTransaction::begin(&self.pool).await?;

        match self.migrate(&mut tx).await {
            Ok(applied) => {
                tx.commit().await?;
                if applied.is_empty() {
                    info!("Nothing to migrate");
                } else {
                    info!(
                        "Applied {} migration(s) in {} ms",
                        applied.len(),
                        start_time.elapsed().as_millis()
                    );
                }
                Ok(applied)
            }
            Err(cause) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed migration run also failed: {}", rollback_err);
                }
                Err(cause.into())
            }
        }
    }

    async fn migrate(&self, tx: &mut MigrationTransaction) -> Result<Vec<String>, FailureCause> {
        self.ensure_ledger_table(tx).await?;
        let latest = self.latest_number(tx).await?;
        debug!("Ledger high-water mark is {}", latest);

        let files = self.directory.scan()?;
        let pending = plan(&files, latest)?;

        let mut applied = Vec::with_capacity(pending.len());
        for file in pending {
            info!("Applying migration: {}", file.file_name);
            let sql = file.read_sql()?;

            tx.execute_script(&sql).await.map_err(|e| {
                FailureCause::execution(format!("execute migration `{}`", file.file_name), e)
            })?;
            self.record_migration(tx, i32::from(file.number), &file.file_name)
                .await?;

            applied.push(file.file_name.clone());
        }

        Ok(applied)
    }

    /// Report every migration on disk and in the ledger.
    ///
    /// The ledger table is created inside a transaction that is always
    /// rolled back, so this never changes the database.
    pub async fn status(&self) -> MigrationResult<Vec<MigrationState>> {
        let mut tx = MigrationTransaction::begin(&self.pool).await?;
        let result = self.collect_status(&mut tx).await;

        if let Err(rollback_err) = tx.rollback().await {
            warn!("Rollback after status query failed: {}", rollback_err);
        }
        Ok(result?)
    }

    async fn collect_status(
        &self,
        tx: &mut MigrationTransaction,
    ) -> Result<Vec<MigrationState>, FailureCause> {
        self.ensure_ledger_table(tx).await?;
        let entries = self.fetch_applied(tx).await?;
        let files = self.directory.scan()?;

        let recorded: BTreeMap<i64, &LedgerEntry> =
            entries.iter().map(|entry| (entry.number, entry)).collect();
        let on_disk: HashSet<i64> = files.iter().map(|f| i64::from(f.number)).collect();

        let mut states = Vec::with_capacity(files.len());
        for file in &files {
            let number = i64::from(file.number);
            let state = match recorded.get(&number) {
                Some(entry) => MigrationState::Applied {
                    number,
                    file: file.file_name.clone(),
                    created: entry.created.clone(),
                },
                None => MigrationState::Pending {
                    number,
                    file: file.file_name.clone(),
                },
            };
            states.push(state);
        }

        for (number, entry) in &recorded {
            if !on_disk.contains(number) {
                states.push(MigrationState::Missing {
                    number: *number,
                    file: entry.file.clone(),
                    created: entry.created.clone(),
                });
            }
        }

        states.sort_by_key(MigrationState::number);
        Ok(states)
    }

    /// Ledger entries ordered by number; empty before the first run
    pub async fn applied(&self) -> MigrationResult<Vec<LedgerEntry>> {
        let mut tx = MigrationTransaction::begin(&self.pool).await?;
        let result = self.load_applied(&mut tx).await;

        if let Err(rollback_err) = tx.rollback().await {
            warn!("Rollback after ledger query failed: {}", rollback_err);
        }
        Ok(result?)
    }

    /// Highest applied migration number, 0 before the first run
    pub async fn latest(&self) -> MigrationResult<i64> {
        let mut tx = MigrationTransaction::begin(&self.pool).await?;
        let result = self.load_latest(&mut tx).await;

        if let Err(rollback_err) = tx.rollback().await {
            warn!("Rollback after ledger query failed: {}", rollback_err);
        }
        Ok(result?)
    }

    async fn load_applied(
        &self,
        tx: &mut MigrationTransaction,
    ) -> Result<Vec<LedgerEntry>, FailureCause> {
        self.ensure_ledger_table(tx).await?;
        self.fetch_applied(tx).await
    }

    async fn load_latest(&self, tx: &mut MigrationTransaction) -> Result<i64, FailureCause> {
        self.ensure_ledger_table(tx).await?;
        self.latest_number(tx).await
    }

    /// Create the ledger table if it does not exist
    async fn ensure_ledger_table(&self, tx: &mut MigrationTransaction) -> Result<(), FailureCause> {
        let sql = self.dialect.create_ledger_table_sql(&self.table);
        tx.execute_script(&sql).await.map_err(|e| {
            FailureCause::execution(format!("create ledger table `{}`", self.table), e)
        })?;
        debug!("Ledger table `{}` is present", self.table);
        Ok(())
    }

    async fn latest_number(&self, tx: &mut MigrationTransaction) -> Result<i64, FailureCause> {
        let sql = self.dialect.latest_number_sql(&self.table);
        let context = || format!("read latest migration from `{}`", self.table);

        let conn = tx
            .connection()
            .map_err(|e| FailureCause::execution(context(), e))?;
        let row = sqlx::query(&sql)
            .fetch_one(conn)
            .await
            .map_err(|e| FailureCause::execution(context(), e))?;

        row.try_get::<i64, _>(0)
            .map_err(|e| FailureCause::execution(context(), e))
    }

    async fn record_migration(
        &self,
        tx: &mut MigrationTransaction,
        number: i32,
        file: &str,
    ) -> Result<(), FailureCause> {
        let sql = self.dialect.record_migration_sql(&self.table);
        let context = || format!("record migration `{}`", file);

        let conn = tx
            .connection()
            .map_err(|e| FailureCause::execution(context(), e))?;
        sqlx::query(&sql)
            .bind(number)
            .bind(file)
            .execute(conn)
            .await
            .map_err(|e| FailureCause::execution(context(), e))?;
        Ok(())
    }

    async fn fetch_applied(
        &self,
        tx: &mut MigrationTransaction,
    ) -> Result<Vec<LedgerEntry>, FailureCause> {
        let sql = self.dialect.applied_migrations_sql(&self.table);
        let context = || format!("read ledger table `{}`", self.table);

        let conn = tx
            .connection()
            .map_err(|e| FailureCause::execution(context(), e))?;
        let rows = sqlx::query(&sql)
            .fetch_all(conn)
            .await
            .map_err(|e| FailureCause::execution(context(), e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = LedgerEntry {
                number: row
                    .try_get("number")
                    .map_err(|e| FailureCause::execution(context(), e))?,
                file: row
                    .try_get("file")
                    .map_err(|e| FailureCause::execution(context(), e))?,
                created: row
                    .try_get("created")
                    .map_err(|e| FailureCause::execution(context(), e))?,
            };
            entries.push(entry);
        }

        Ok(entries)
    }
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("dialect", &self.dialect)
            .field("migrations_dir", &self.directory.path())
            .field("table", &self.table)
            .finish()
    }
}
