//! Repositories for the `collaboration`, `group_collaboration`, and
//! legacy `collaboration_status` tables.

use packshare_core::types::DbId;
use sqlx::PgConnection;

use crate::models::collaboration::{
    Collaboration, CollaborationDetail, CollaborationStatus, GroupCollaboration,
    GroupCollaborationDetail,
};

/// Column list for `collaboration` queries.
const COLUMNS: &str = "collab_id, owner_id, collaborator_id, package_id";

/// Joined select shared by the detail listings.
const DETAIL_SELECT: &str = "SELECT c.collab_id, c.owner_id, o.user_login AS owner_login, \
     c.collaborator_id, u.user_login AS collaborator_login, \
     c.package_id, p.package_name \
     FROM collaboration c \
     JOIN \"user\" o ON o.user_id = c.owner_id \
     JOIN \"user\" u ON u.user_id = c.collaborator_id \
     JOIN package p ON p.package_id = c.package_id";

/// Provides operations for individual collaborations.
pub struct CollaborationRepo;

impl CollaborationRepo {
    /// Create a collaboration grant. Idempotent on the unique
    /// (collaborator, package) pair: `None` when the grant already exists.
    pub async fn try_insert(
        conn: &mut PgConnection,
        owner_id: DbId,
        collaborator_id: DbId,
        package_id: DbId,
    ) -> Result<Option<Collaboration>, sqlx::Error> {
        let query = format!(
            "INSERT INTO collaboration (owner_id, collaborator_id, package_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (collaborator_id, package_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Collaboration>(&query)
            .bind(owner_id)
            .bind(collaborator_id)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// Find a collaboration by its primary key.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Collaboration>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collaboration WHERE collab_id = $1");
        sqlx::query_as::<_, Collaboration>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find the grant permitting `collaborator_id` to open `package_id`.
    pub async fn find_by_collaborator_and_package(
        conn: &mut PgConnection,
        collaborator_id: DbId,
        package_id: DbId,
    ) -> Result<Option<Collaboration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collaboration \
             WHERE collaborator_id = $1 AND package_id = $2"
        );
        sqlx::query_as::<_, Collaboration>(&query)
            .bind(collaborator_id)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// Delete one collaboration. The legacy status row cascades away.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM collaboration WHERE collab_id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All collaborations on packages the user owns, with display names.
    pub async fn list_by_owner(
        conn: &mut PgConnection,
        owner_id: DbId,
    ) -> Result<Vec<CollaborationDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} WHERE c.owner_id = $1 \
             ORDER BY p.package_name, u.user_login"
        );
        sqlx::query_as::<_, CollaborationDetail>(&query)
            .bind(owner_id)
            .fetch_all(conn)
            .await
    }

    /// All collaborations where the user is the collaborator.
    pub async fn list_by_collaborator(
        conn: &mut PgConnection,
        collaborator_id: DbId,
    ) -> Result<Vec<CollaborationDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT} WHERE c.collaborator_id = $1 \
             ORDER BY o.user_login, p.package_name"
        );
        sqlx::query_as::<_, CollaborationDetail>(&query)
            .bind(collaborator_id)
            .fetch_all(conn)
            .await
    }
}

/// Column list for `group_collaboration` queries.
const GROUP_COLUMNS: &str = "group_collab_id, owner_id, user_group_id, package_id";

/// Joined select for group collaboration detail listings.
const GROUP_DETAIL_SELECT: &str = "SELECT gc.group_collab_id, gc.owner_id, \
     o.user_login AS owner_login, gc.user_group_id, g.user_group_name, \
     gc.package_id, p.package_name \
     FROM group_collaboration gc \
     JOIN \"user\" o ON o.user_id = gc.owner_id \
     JOIN user_group g ON g.user_group_id = gc.user_group_id \
     JOIN package p ON p.package_id = gc.package_id";

/// Provides operations for group collaborations.
pub struct GroupCollaborationRepo;

impl GroupCollaborationRepo {
    /// Create a group collaboration. `None` when the (group, package) pair
    /// is already granted.
    pub async fn try_insert(
        conn: &mut PgConnection,
        owner_id: DbId,
        group_id: DbId,
        package_id: DbId,
    ) -> Result<Option<GroupCollaboration>, sqlx::Error> {
        let query = format!(
            "INSERT INTO group_collaboration (owner_id, user_group_id, package_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_group_id, package_id) DO NOTHING \
             RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, GroupCollaboration>(&query)
            .bind(owner_id)
            .bind(group_id)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// Find a group collaboration by its primary key.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<GroupCollaboration>, sqlx::Error> {
        let query =
            format!("SELECT {GROUP_COLUMNS} FROM group_collaboration WHERE group_collab_id = $1");
        sqlx::query_as::<_, GroupCollaboration>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find the grant for a (group, package) pair.
    pub async fn find_by_group_and_package(
        conn: &mut PgConnection,
        group_id: DbId,
        package_id: DbId,
    ) -> Result<Option<GroupCollaboration>, sqlx::Error> {
        let query = format!(
            "SELECT {GROUP_COLUMNS} FROM group_collaboration \
             WHERE user_group_id = $1 AND package_id = $2"
        );
        sqlx::query_as::<_, GroupCollaboration>(&query)
            .bind(group_id)
            .bind(package_id)
            .fetch_optional(conn)
            .await
    }

    /// Delete one group collaboration row.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_collaboration WHERE group_collab_id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All group collaborations on packages the user owns.
    pub async fn list_by_owner(
        conn: &mut PgConnection,
        owner_id: DbId,
    ) -> Result<Vec<GroupCollaborationDetail>, sqlx::Error> {
        let query = format!(
            "{GROUP_DETAIL_SELECT} WHERE gc.owner_id = $1 \
             ORDER BY p.package_name, g.user_group_name"
        );
        sqlx::query_as::<_, GroupCollaborationDetail>(&query)
            .bind(owner_id)
            .fetch_all(conn)
            .await
    }

    /// All group collaborations visible to the user through a membership,
    /// excluding packages the user owns (those appear in the owner
    /// listing instead).
    pub async fn list_by_member(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<GroupCollaborationDetail>, sqlx::Error> {
        let query = format!(
            "{GROUP_DETAIL_SELECT} \
             JOIN user_group_membership m \
               ON m.user_group_id = gc.user_group_id AND m.user_id = $1 \
             WHERE gc.owner_id <> $1 \
             ORDER BY o.user_login, p.package_name"
        );
        sqlx::query_as::<_, GroupCollaborationDetail>(&query)
            .bind(user_id)
            .fetch_all(conn)
            .await
    }
}

/// Provides operations for the legacy status table. Kept for schema
/// compatibility only.
pub struct CollaborationStatusRepo;

impl CollaborationStatusRepo {
    /// Set or replace the status tag of a collaboration.
    pub async fn upsert(
        conn: &mut PgConnection,
        collab_id: DbId,
        status: &str,
    ) -> Result<CollaborationStatus, sqlx::Error> {
        sqlx::query_as::<_, CollaborationStatus>(
            "INSERT INTO collaboration_status (collab_id, status) VALUES ($1, $2) \
             ON CONFLICT (collab_id) DO UPDATE SET status = EXCLUDED.status \
             RETURNING id, collab_id, status",
        )
        .bind(collab_id)
        .bind(status)
        .fetch_one(conn)
        .await
    }

    /// The status tag of a collaboration, if one was ever recorded.
    pub async fn find_by_collab(
        conn: &mut PgConnection,
        collab_id: DbId,
    ) -> Result<Option<CollaborationStatus>, sqlx::Error> {
        sqlx::query_as::<_, CollaborationStatus>(
            "SELECT id, collab_id, status FROM collaboration_status WHERE collab_id = $1",
        )
        .bind(collab_id)
        .fetch_optional(conn)
        .await
    }
}
