//! Scoped unit of work over the connection pool.

use sqlx::{PgConnection, Postgres, Transaction};

use crate::DbPool;

/// A transactional scope for one collaboration operation.
///
/// Service entry points open the unit of work; every internal helper takes
/// `&mut PgConnection` from [`UnitOfWork::conn`], so nested calls share the
/// outermost transaction and only the outermost scope commits or rolls
/// back. Dropping an uncommitted unit of work rolls it back.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
    /// Open a new transactional scope.
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    /// The connection all repository calls inside this scope must use.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Commit the scope.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    /// Roll the scope back explicitly.
    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}
