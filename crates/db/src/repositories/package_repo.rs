//! Repository for the `package` table.

use packshare_core::types::DbId;
use sqlx::PgConnection;

use crate::models::package::Package;

/// Column list shared across queries.
const COLUMNS: &str = "package_id, owner_id, package_name";

/// Provides operations for packages.
pub struct PackageRepo;

impl PackageRepo {
    /// Insert a package if the (owner, name) pair is free; `None` when
    /// another caller created it first.
    pub async fn try_insert(
        conn: &mut PgConnection,
        owner_id: DbId,
        name: &str,
    ) -> Result<Option<Package>, sqlx::Error> {
        let query = format!(
            "INSERT INTO package (owner_id, package_name) VALUES ($1, $2) \
             ON CONFLICT (owner_id, package_name) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Package>(&query)
            .bind(owner_id)
            .bind(name)
            .fetch_optional(conn)
            .await
    }

    /// Find a package by its unique (owner, name) pair.
    pub async fn find_by_owner_and_name(
        conn: &mut PgConnection,
        owner_id: DbId,
        name: &str,
    ) -> Result<Option<Package>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM package WHERE owner_id = $1 AND package_name = $2");
        sqlx::query_as::<_, Package>(&query)
            .bind(owner_id)
            .bind(name)
            .fetch_optional(conn)
            .await
    }

    /// Find a package by internal ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Package>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM package WHERE package_id = $1");
        sqlx::query_as::<_, Package>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Delete every package with no locks and no collaborations of either
    /// kind. Active-package pointers at deleted rows are cleared by the
    /// `ON DELETE SET NULL` constraint; pending invitations cascade away
    /// with their package. Returns the number of rows removed.
    pub async fn delete_orphaned(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM package p \
             WHERE NOT EXISTS (SELECT 1 FROM \"lock\" l WHERE l.package_id = p.package_id) \
               AND NOT EXISTS (SELECT 1 FROM group_lock gl WHERE gl.package_id = p.package_id) \
               AND NOT EXISTS (SELECT 1 FROM collaboration c WHERE c.package_id = p.package_id) \
               AND NOT EXISTS (SELECT 1 FROM group_collaboration gc \
                               WHERE gc.package_id = p.package_id)",
        )
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }
}
