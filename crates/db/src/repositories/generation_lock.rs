//! Per-module-code generation lock.
//!
//! Backed by a Postgres transaction-scoped advisory lock. The guard owns the
//! transaction; the lock is released when the guard is released or dropped
//! (dropping a sqlx transaction rolls it back), so a run that panics or
//! returns early cannot leave the code locked.

use sqlx::{PgPool, Postgres, Transaction};

/// Namespace mixed into the lock key so module codes cannot collide with
/// advisory locks taken by other features.
const LOCK_NAMESPACE: &str = "module_generation";

/// Held while a generation run for one module code is in progress.
pub struct GenerationLock {
    tx: Transaction<'static, Postgres>,
    code: String,
}

impl GenerationLock {
    /// Try to take the lock for `code` without waiting.
    ///
    /// Returns `None` if another session already holds it.
    pub async fn try_acquire(pool: &PgPool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let acquired: bool =
            sqlx::query_scalar("SELECT pg_try_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(lock_key(code))
                .fetch_one(&mut *tx)
                .await?;

        if !acquired {
            tx.rollback().await?;
            tracing::debug!(module_code = %code, "Generation lock busy");
            return Ok(None);
        }

        tracing::debug!(module_code = %code, "Generation lock acquired");
        Ok(Some(Self {
            tx,
            code: code.to_string(),
        }))
    }

    /// Release the lock.
    pub async fn release(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await?;
        tracing::debug!(module_code = %self.code, "Generation lock released");
        Ok(())
    }
}

fn lock_key(code: &str) -> String {
    format!("{LOCK_NAMESPACE}:{code}")
}
