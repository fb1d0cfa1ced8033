//! Package entity model.

use packshare_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `package` table: one shared document instance, unique
/// per (owner, name). Rows are created lazily on first reference and
/// garbage-collected once nothing points at them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Package {
    pub package_id: DbId,
    pub owner_id: DbId,
    pub package_name: String,
}
