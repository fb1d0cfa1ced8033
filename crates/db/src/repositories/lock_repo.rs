//! Repositories for the `"lock"` and `group_lock` tables.

use packshare_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::lock::{GroupLock, Lock};

/// Column list for `"lock"` queries.
const LOCK_COLUMNS: &str = "lock_id, package_id, locked_by, \"timestamp\", comment";

/// Provides operations for individual exclusive locks.
pub struct LockRepo;

impl LockRepo {
    /// Attempt to acquire the package's individual lock.
    ///
    /// Uses `INSERT ... ON CONFLICT DO NOTHING` against the unique
    /// `package_id` constraint. `None` means the insert lost a race to a
    /// concurrent holder; the caller translates that into a domain error
    /// after re-reading the row. The conflict path never aborts the
    /// surrounding transaction.
    pub async fn try_insert(
        conn: &mut PgConnection,
        package_id: DbId,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO \"lock\" (package_id, locked_by, \"timestamp\") \
             VALUES ($1, $2, $3) \
             ON CONFLICT (package_id) DO NOTHING \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(package_id)
            .bind(user_id)
            .bind(now)
            .fetch_optional(conn)
            .await
    }

    /// The current lock on a package, if any.
    pub async fn find_by_package(
        conn: &mut PgConnection,
        package_id: DbId,
    ) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM \"lock\" WHERE package_id = $1");
        sqlx::query_as::<_, Lock>(&query)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// The lock a user currently holds, if any. A user holds at most one.
    pub async fn find_by_holder(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM \"lock\" WHERE locked_by = $1");
        sqlx::query_as::<_, Lock>(&query)
            .bind(user_id)
            .fetch_optional(conn)
            .await
    }

    /// Slide the lock's timestamp forward. Returns `false` if the row is
    /// gone.
    pub async fn refresh(
        conn: &mut PgConnection,
        lock_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE \"lock\" SET \"timestamp\" = $2 WHERE lock_id = $1")
            .bind(lock_id)
            .bind(now)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one lock row.
    pub async fn delete(conn: &mut PgConnection, lock_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM \"lock\" WHERE lock_id = $1")
            .bind(lock_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release whatever lock the user holds, anywhere.
    pub async fn delete_by_holder(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM \"lock\" WHERE locked_by = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Release the locks of every listed holder. Used by the cascading
    /// group-lock release.
    pub async fn delete_by_holders(
        conn: &mut PgConnection,
        user_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM \"lock\" WHERE locked_by = ANY($1)")
            .bind(user_ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Release a specific user's lock on a specific package.
    pub async fn delete_by_package_and_holder(
        conn: &mut PgConnection,
        package_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM \"lock\" WHERE package_id = $1 AND locked_by = $2")
            .bind(package_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every lock stamped before `cutoff`, returning the deleted
    /// rows so the sweep can clear the holders' active-package pointers.
    pub async fn delete_expired(
        conn: &mut PgConnection,
        cutoff: Timestamp,
    ) -> Result<Vec<Lock>, sqlx::Error> {
        let query = format!(
            "DELETE FROM \"lock\" WHERE \"timestamp\" < $1 RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(cutoff)
            .fetch_all(conn)
            .await
    }
}

/// Column list for `group_lock` queries.
const GROUP_LOCK_COLUMNS: &str = "group_lock_id, package_id, locked_by";

/// Provides operations for group locks.
pub struct GroupLockRepo;

impl GroupLockRepo {
    /// Attempt to place a group lock on the package. `None` means one
    /// already exists (unique on `package_id`).
    pub async fn try_insert(
        conn: &mut PgConnection,
        package_id: DbId,
        group_id: DbId,
    ) -> Result<Option<GroupLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO group_lock (package_id, locked_by) VALUES ($1, $2) \
             ON CONFLICT (package_id) DO NOTHING \
             RETURNING {GROUP_LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, GroupLock>(&query)
            .bind(package_id)
            .bind(group_id)
            .fetch_optional(conn)
            .await
    }

    /// The current group lock on a package, if any.
    pub async fn find_by_package(
        conn: &mut PgConnection,
        package_id: DbId,
    ) -> Result<Option<GroupLock>, sqlx::Error> {
        let query = format!("SELECT {GROUP_LOCK_COLUMNS} FROM group_lock WHERE package_id = $1");
        sqlx::query_as::<_, GroupLock>(&query)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// Remove the group lock from a package. Returns `false` if none was
    /// present.
    pub async fn delete_by_package(
        conn: &mut PgConnection,
        package_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_lock WHERE package_id = $1")
            .bind(package_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
