//! User entity model.

use packshare_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `"user"` table.
///
/// `active_package_id` points at the single package the user currently has
/// open, or `NULL` when nothing is open.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: DbId,
    pub user_login: String,
    pub active_package_id: Option<DbId>,
}
