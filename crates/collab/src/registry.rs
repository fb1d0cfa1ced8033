//! Identity and package registry.
//!
//! Maps opaque external login strings and (owner, name) pairs to internal
//! rows, creating them lazily on first reference. First-creation races are
//! resolved by the store's unique constraints plus a re-select on
//! conflict, never by application-level locking.

use packshare_core::error::CollabError;
use packshare_db::models::group::UserGroup;
use packshare_db::models::package::Package;
use packshare_db::models::user::User;
use packshare_db::repositories::{PackageRepo, UserGroupRepo, UserRepo};
use sqlx::PgConnection;

use crate::error::{ServiceError, ServiceResult};

/// Resolve a login to a user row, optionally creating it.
pub async fn resolve_user(
    conn: &mut PgConnection,
    login: &str,
    create_if_missing: bool,
) -> ServiceResult<Option<User>> {
    if let Some(user) = UserRepo::find_by_login(conn, login).await? {
        return Ok(Some(user));
    }
    if !create_if_missing {
        return Ok(None);
    }
    if let Some(user) = UserRepo::try_insert(conn, login).await? {
        return Ok(Some(user));
    }
    // Lost the first-creation race; the row exists now.
    Ok(UserRepo::find_by_login(conn, login).await?)
}

/// Resolve a login to an existing user, failing with `UserNotFound`.
pub async fn require_user(conn: &mut PgConnection, login: &str) -> ServiceResult<User> {
    resolve_user(conn, login, false)
        .await?
        .ok_or_else(|| CollabError::UserNotFound(login.to_string()).into())
}

/// Resolve an (owner login, package name) pair to a package row,
/// optionally creating both the owner and the package.
pub async fn resolve_package(
    conn: &mut PgConnection,
    owner_login: &str,
    name: &str,
    create_if_missing: bool,
) -> ServiceResult<Option<Package>> {
    let Some(owner) = resolve_user(conn, owner_login, create_if_missing).await? else {
        return Ok(None);
    };
    if let Some(package) = PackageRepo::find_by_owner_and_name(conn, owner.user_id, name).await? {
        return Ok(Some(package));
    }
    if !create_if_missing {
        return Ok(None);
    }
    if let Some(package) = PackageRepo::try_insert(conn, owner.user_id, name).await? {
        return Ok(Some(package));
    }
    Ok(PackageRepo::find_by_owner_and_name(conn, owner.user_id, name).await?)
}

/// Find-or-create a group by name. Used by the startup seeding.
pub async fn resolve_group(conn: &mut PgConnection, name: &str) -> ServiceResult<UserGroup> {
    if let Some(group) = UserGroupRepo::find_by_name(conn, name).await? {
        return Ok(group);
    }
    if let Some(group) = UserGroupRepo::try_insert(conn, name).await? {
        return Ok(group);
    }
    UserGroupRepo::find_by_name(conn, name)
        .await?
        .ok_or_else(|| ServiceError::inconsistency(format!("group '{name}' vanished mid-creation")))
}
