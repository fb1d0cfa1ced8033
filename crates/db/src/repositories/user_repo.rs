//! Repository for the `"user"` table.

use packshare_core::types::DbId;
use sqlx::PgConnection;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "user_id, user_login, active_package_id";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user if the login is free.
    ///
    /// Uses `INSERT ... ON CONFLICT DO NOTHING` against the unique login
    /// constraint; returns `None` when another caller created the row
    /// first, so find-or-create races resolve without aborting the
    /// surrounding transaction.
    pub async fn try_insert(
        conn: &mut PgConnection,
        login: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "INSERT INTO \"user\" (user_login) VALUES ($1) \
             ON CONFLICT (user_login) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(conn)
            .await
    }

    /// Find a user by login (case-sensitive).
    pub async fn find_by_login(
        conn: &mut PgConnection,
        login: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM \"user\" WHERE user_login = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(conn)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM \"user\" WHERE user_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Point a user at their currently open package (or at nothing).
    pub async fn set_active_package(
        conn: &mut PgConnection,
        user_id: DbId,
        package_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE \"user\" SET active_package_id = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(package_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Clear the active package pointer for every listed user. Used when
    /// the sweep reclaims their expired locks.
    pub async fn clear_active_package(
        conn: &mut PgConnection,
        user_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE \"user\" SET active_package_id = NULL WHERE user_id = ANY($1)")
                .bind(user_ids)
                .execute(conn)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete every user referenced by no package, collaboration, group
    /// collaboration, or lock. Memberships and pending invitations of a
    /// deleted user cascade away. Returns the number of rows removed.
    pub async fn delete_unreferenced(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM \"user\" u \
             WHERE NOT EXISTS (SELECT 1 FROM package p WHERE p.owner_id = u.user_id) \
               AND NOT EXISTS (SELECT 1 FROM collaboration c \
                               WHERE c.owner_id = u.user_id OR c.collaborator_id = u.user_id) \
               AND NOT EXISTS (SELECT 1 FROM group_collaboration gc WHERE gc.owner_id = u.user_id) \
               AND NOT EXISTS (SELECT 1 FROM \"lock\" l WHERE l.locked_by = u.user_id)",
        )
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
