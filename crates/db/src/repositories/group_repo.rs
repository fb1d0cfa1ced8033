//! Repositories for the `user_group` and `user_group_membership` tables.

use packshare_core::types::DbId;
use sqlx::PgConnection;

use crate::models::group::UserGroup;

/// Column list for `user_group` queries.
const COLUMNS: &str = "user_group_id, user_group_name";

/// Provides operations for user groups.
pub struct UserGroupRepo;

impl UserGroupRepo {
    /// Insert a group if the name is free; `None` when it already exists.
    pub async fn try_insert(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<UserGroup>, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_group (user_group_name) VALUES ($1) \
             ON CONFLICT (user_group_name) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(name)
            .fetch_optional(conn)
            .await
    }

    /// Find a group by its unique name.
    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<UserGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_group WHERE user_group_name = $1");
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(name)
            .fetch_optional(conn)
            .await
    }

    /// Find a group by internal ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<UserGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_group WHERE user_group_id = $1");
        sqlx::query_as::<_, UserGroup>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }
}

/// Provides operations for group memberships.
pub struct MembershipRepo;

impl MembershipRepo {
    /// Add a user to a group. Idempotent: returns `false` if the
    /// membership already existed.
    pub async fn add(
        conn: &mut PgConnection,
        user_id: DbId,
        group_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_group_membership (user_id, user_group_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, user_group_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(group_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `true` if the user belongs to the group.
    pub async fn is_member(
        conn: &mut PgConnection,
        user_id: DbId,
        group_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM user_group_membership \
             WHERE user_id = $1 AND user_group_id = $2)",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// IDs of every current member of a group.
    pub async fn member_ids(
        conn: &mut PgConnection,
        group_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT user_id FROM user_group_membership \
             WHERE user_group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
