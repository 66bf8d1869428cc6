//! Row-Level Security (RLS) context management.
//!
//! Every unit of work against PostgreSQL runs inside a transaction that has
//! `app.current_tenant_id` set, so the `tenant_isolation` policies hide every
//! other tenant's rows. The setting is transaction-local and disappears on
//! commit or rollback.
//!
//! ```ignore
//! let rls = RlsConnection::begin(&db, tenant_id, Duration::from_secs(2)).await?;
//! let docs = documents::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use std::time::Duration;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait,
};

use bookwell_shared::types::TenantId;

/// A transaction bound to one tenant.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction, binds `tenant_id` and bounds lock waits by
    /// `lock_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or configured.
    pub async fn begin(
        db: &DatabaseConnection,
        tenant_id: TenantId,
        lock_timeout: Duration,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_tenant_context(&txn, tenant_id).await?;
        txn.execute_unprepared(&lock_timeout_sql(lock_timeout))
            .await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Binds `tenant_id` on an existing transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_tenant_context(txn: &DatabaseTransaction, tenant_id: TenantId) -> Result<(), DbErr> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT set_config('app.current_tenant_id', $1, true)",
        [tenant_id.to_string().into()],
    ))
    .await?;
    Ok(())
}

fn lock_timeout_sql(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_sql() {
        assert_eq!(
            lock_timeout_sql(Duration::from_millis(2000)),
            "SET LOCAL lock_timeout = '2000ms'"
        );
        // zero would disable the timeout entirely
        assert_eq!(
            lock_timeout_sql(Duration::ZERO),
            "SET LOCAL lock_timeout = '1ms'"
        );
    }
}
