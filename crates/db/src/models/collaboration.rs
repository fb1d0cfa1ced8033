//! Collaboration and group-collaboration models.

use packshare_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `collaboration` table: a standing grant that
/// `collaborator_id` may open `owner_id`'s package.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Collaboration {
    pub collab_id: DbId,
    pub owner_id: DbId,
    pub collaborator_id: DbId,
    pub package_id: DbId,
}

/// A collaboration joined with the logins and package name the summary
/// views need.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CollaborationDetail {
    pub collab_id: DbId,
    pub owner_id: DbId,
    pub owner_login: String,
    pub collaborator_id: DbId,
    pub collaborator_login: String,
    pub package_id: DbId,
    pub package_name: String,
}

/// A row from the `group_collaboration` table. Expanded into one
/// [`Collaboration`] per member at creation time; membership changes are
/// not retroactively propagated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupCollaboration {
    pub group_collab_id: DbId,
    pub owner_id: DbId,
    pub user_group_id: DbId,
    pub package_id: DbId,
}

/// A group collaboration joined with display names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupCollaborationDetail {
    pub group_collab_id: DbId,
    pub owner_id: DbId,
    pub owner_login: String,
    pub user_group_id: DbId,
    pub user_group_name: String,
    pub package_id: DbId,
    pub package_name: String,
}

/// A row from the legacy `collaboration_status` table. Kept for schema
/// compatibility; the action-resolution logic never consults it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CollaborationStatus {
    pub id: DbId,
    pub collab_id: DbId,
    pub status: String,
}
