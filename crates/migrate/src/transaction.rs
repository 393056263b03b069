//! Transaction Management
//!
//! A run happens inside one transaction. [`MigrationTransaction`] owns it and
//! makes sure it ends in either a commit or a rollback.

use sqlx::{Any, AnyConnection, AnyPool, Executor, Transaction};
use tracing::{debug, warn};

use crate::error::FailureCause;

/// Run-scoped transaction with explicit commit/rollback
pub struct MigrationTransaction {
    inner: Option<Transaction<'static, Any>>,
}

impl MigrationTransaction {
    /// Begin a new transaction on the pool
    pub async fn begin(pool: &AnyPool) -> Result<Self, FailureCause> {
        debug!("Beginning migration transaction");
        let tx = pool
            .begin()
            .await
            .map_err(|e| FailureCause::execution("begin transaction", e))?;

        Ok(Self { inner: Some(tx) })
    }

    /// Connection of the open transaction, for bound queries
    pub fn connection(&mut self) -> Result<&mut AnyConnection, sqlx::Error> {
        match self.inner.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(sqlx::Error::Protocol(
                "migration transaction already finished".to_string(),
            )),
        }
    }

    /// Execute a raw SQL script verbatim.
    ///
    /// No arguments are bound, so the script goes through the unprepared path
    /// and may contain several statements.
    pub async fn execute_script(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        let result = self.connection()?.execute(sql).await?;
        Ok(result.rows_affected())
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), FailureCause> {
        if let Some(tx) = self.inner.take() {
            debug!("Committing migration transaction");
            tx.commit()
                .await
                .map_err(|e| FailureCause::execution("commit transaction", e))?;
        }
        Ok(())
    }

    /// Roll the transaction back
    pub async fn rollback(mut self) -> Result<(), FailureCause> {
        if let Some(tx) = self.inner.take() {
            debug!("Rolling back migration transaction");
            tx.rollback()
                .await
                .map_err(|e| FailureCause::execution("roll back transaction", e))?;
        }
        Ok(())
    }
}

impl Drop for MigrationTransaction {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            // sqlx rolls back on drop; we cannot await here
            warn!("Migration transaction dropped without commit or rollback, rolling back");
        }
    }
}
