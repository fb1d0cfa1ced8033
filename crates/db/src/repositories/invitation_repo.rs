//! Repository for the `invitation` table.

use packshare_core::types::{DbId, Timestamp};
use sqlx::PgConnection;

use crate::models::invitation::{Invitation, InvitationDetail, NewInvitation};

/// Column list shared across queries.
const COLUMNS: &str = "invitation_id, inviter_id, inviter_name, inviter_email, \
     invitee_name, invitee_email, package_id, invitation_code, date";

/// Provides operations for pending invitations.
pub struct InvitationRepo;

impl InvitationRepo {
    /// Persist a new invitation under the given code.
    ///
    /// The caller checks code uniqueness first; a lost race on the unique
    /// code constraint still surfaces as a database error to regenerate on.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewInvitation,
        code: &str,
        date: Timestamp,
    ) -> Result<Invitation, sqlx::Error> {
        let query = format!(
            "INSERT INTO invitation \
                (inviter_id, inviter_name, inviter_email, invitee_name, invitee_email, \
                 package_id, invitation_code, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(input.inviter_id)
            .bind(&input.inviter_name)
            .bind(&input.inviter_email)
            .bind(&input.invitee_name)
            .bind(&input.invitee_email)
            .bind(input.package_id)
            .bind(code)
            .bind(date)
            .fetch_one(conn)
            .await
    }

    /// Find a pending invitation by its code.
    pub async fn find_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invitation WHERE invitation_code = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(code)
            .fetch_optional(conn)
            .await
    }

    /// Find an invitation by its primary key.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invitation WHERE invitation_id = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Returns `true` if a pending invitation already uses the code.
    pub async fn code_exists(conn: &mut PgConnection, code: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM invitation WHERE invitation_code = $1)")
                .bind(code)
                .fetch_one(conn)
                .await?;
        Ok(row.0)
    }

    /// Consume (delete) an invitation. Returns `false` if it was already
    /// gone.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invitation WHERE invitation_id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All pending invitations created by a user, newest first.
    pub async fn list_by_inviter(
        conn: &mut PgConnection,
        inviter_id: DbId,
    ) -> Result<Vec<InvitationDetail>, sqlx::Error> {
        sqlx::query_as::<_, InvitationDetail>(
            "SELECT i.invitation_id, i.inviter_id, i.inviter_name, i.inviter_email, \
                    i.invitee_name, i.invitee_email, i.package_id, p.package_name, \
                    i.invitation_code, i.date \
             FROM invitation i \
             JOIN package p ON p.package_id = i.package_id \
             WHERE i.inviter_id = $1 \
             ORDER BY i.date DESC",
        )
        .bind(inviter_id)
        .fetch_all(conn)
        .await
    }
}
