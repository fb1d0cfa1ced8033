//! User group and membership models.

use packshare_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_group` table. Groups are seeded from static
/// configuration at process start.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserGroup {
    pub user_group_id: DbId,
    pub user_group_name: String,
}

/// A row from the `user_group_membership` table, unique per (user, group).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserGroupMembership {
    pub id: DbId,
    pub user_id: DbId,
    pub user_group_id: DbId,
}
