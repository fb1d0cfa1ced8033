//! Invitation model and DTOs.

use packshare_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `invitation` table: a short-lived, code-based offer that
/// becomes a collaboration upon acceptance.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invitation {
    pub invitation_id: DbId,
    pub inviter_id: DbId,
    pub inviter_name: String,
    pub inviter_email: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub package_id: DbId,
    pub invitation_code: String,
    pub date: Timestamp,
}

/// DTO for creating an invitation. The code and date are assigned by the
/// service layer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvitation {
    pub inviter_id: DbId,
    pub inviter_name: String,
    pub inviter_email: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub package_id: DbId,
}

/// An invitation joined with its package name for the summary views.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvitationDetail {
    pub invitation_id: DbId,
    pub inviter_id: DbId,
    pub inviter_name: String,
    pub inviter_email: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub package_id: DbId,
    pub package_name: String,
    pub invitation_code: String,
    pub date: Timestamp,
}
