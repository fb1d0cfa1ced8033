//! Individual and group lock models.

use packshare_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `"lock"` table: an individual exclusive lease with a
/// sliding timestamp. At most one exists per package.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lock {
    pub lock_id: DbId,
    pub package_id: DbId,
    pub locked_by: DbId,
    pub timestamp: Timestamp,
    /// Free-form note attached at acquisition. Unused by the core logic.
    pub comment: Option<String>,
}

/// A row from the `group_lock` table: a lease held on behalf of every
/// member of a user group. At most one exists per package; it dominates
/// individual locks held by non-members.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupLock {
    pub group_lock_id: DbId,
    pub package_id: DbId,
    pub locked_by: DbId,
}
