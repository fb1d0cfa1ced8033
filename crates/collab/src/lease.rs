//! The lease manager: lock acquisition, renewal, timeout-based
//! reclamation, eviction, and release.
//!
//! There is no application-level mutex around "check lock, then create
//! lock". The unique `package_id` constraint on the lock tables is the
//! concurrency-safety primitive; an insert that loses the race is
//! translated into a domain error after a re-read.

use std::sync::Arc;

use chrono::Utc;
use packshare_core::error::CollabError;
use packshare_core::lease::{is_expired, LockStatus};
use packshare_core::types::DbId;
use packshare_db::models::group::UserGroup;
use packshare_db::models::package::Package;
use packshare_db::models::user::User;
use packshare_db::repositories::{
    GroupLockRepo, LockRepo, MembershipRepo, PackageRepo, UserGroupRepo, UserRepo,
};
use packshare_db::uow::UnitOfWork;
use packshare_db::DbPool;
use sqlx::PgConnection;

use crate::config::CollabConfig;
use crate::error::{rollback_quietly, soften, ServiceError, ServiceResult};
use crate::registry::{require_user, resolve_package, resolve_user};

/// Coordinates the exclusive editing leases on packages.
#[derive(Clone)]
pub struct LeaseManager {
    pool: DbPool,
    config: Arc<CollabConfig>,
}

impl LeaseManager {
    pub fn new(pool: DbPool, config: Arc<CollabConfig>) -> Self {
        Self { pool, config }
    }

    // -----------------------------------------------------------------------
    // Public operations (each is one unit of work)
    // -----------------------------------------------------------------------

    /// A user navigates to a document: release whatever lock they hold
    /// elsewhere, point their session at the package, and acquire.
    pub async fn open_package(
        &self,
        user_login: &str,
        package_name: &str,
        owner_login: &str,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.open_package_tx(user_login, package_name, owner_login)
                .await,
        )
    }

    async fn open_package_tx(
        &self,
        user_login: &str,
        package_name: &str,
        owner_login: &str,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match self
            .open_package_in(uow.conn(), user_login, package_name, owner_login)
            .await
        {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    async fn open_package_in(
        &self,
        conn: &mut PgConnection,
        user_login: &str,
        package_name: &str,
        owner_login: &str,
    ) -> ServiceResult<()> {
        let user = resolve_user(conn, user_login, true)
            .await?
            .ok_or_else(|| CollabError::UserNotFound(user_login.to_string()))?;

        // One individual lock per user: opening a package releases any
        // lock held elsewhere.
        LockRepo::delete_by_holder(conn, user.user_id).await?;

        self.update_lock_in(conn, &user, package_name, Some(owner_login), true)
            .await
    }

    /// The acquisition algorithm, used by `open_package` and by routine
    /// "still editing" pings from the session.
    pub async fn update_lock(
        &self,
        user_login: &str,
        package_name: &str,
        owner_login: Option<&str>,
        opening: bool,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.update_lock_tx(user_login, package_name, owner_login, opening)
                .await,
        )
    }

    async fn update_lock_tx(
        &self,
        user_login: &str,
        package_name: &str,
        owner_login: Option<&str>,
        opening: bool,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let result = match resolve_user(uow.conn(), user_login, true).await {
            Ok(Some(user)) => {
                self.update_lock_in(uow.conn(), &user, package_name, owner_login, opening)
                    .await
            }
            Ok(None) => Err(CollabError::UserNotFound(user_login.to_string()).into()),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    async fn update_lock_in(
        &self,
        conn: &mut PgConnection,
        user: &User,
        package_name: &str,
        owner_login: Option<&str>,
        opening: bool,
    ) -> ServiceResult<()> {
        let package = if opening {
            let owner = owner_login.ok_or_else(|| {
                ServiceError::inconsistency("opening a package requires an owner login")
            })?;
            let package = resolve_package(conn, owner, package_name, true)
                .await?
                .ok_or_else(|| {
                    ServiceError::inconsistency(format!(
                        "package '{package_name}' could not be resolved for owner '{owner}'"
                    ))
                })?;
            UserRepo::set_active_package(conn, user.user_id, Some(package.package_id)).await?;
            package
        } else {
            let active = match user.active_package_id {
                Some(id) => PackageRepo::find_by_id(conn, id).await?,
                None => None,
            };
            match active {
                Some(package) if package.package_name == package_name => package,
                stale => {
                    // The session pings a package that is not the recorded
                    // active one. Fall back to the user's own package of
                    // that name instead of failing the ping; this is an
                    // implicit re-open, so any lock held elsewhere goes
                    // first (one lock per user).
                    if stale.is_some() {
                        tracing::warn!(
                            user = %user.user_login,
                            package = package_name,
                            "active package mismatch, re-resolving as owner"
                        );
                    }
                    LockRepo::delete_by_holder(conn, user.user_id).await?;
                    let package = resolve_package(conn, &user.user_login, package_name, true)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::inconsistency(format!(
                                "package '{package_name}' could not be resolved for '{}'",
                                user.user_login
                            ))
                        })?;
                    UserRepo::set_active_package(conn, user.user_id, Some(package.package_id))
                        .await?;
                    package
                }
            }
        };

        self.acquire(conn, user, &package).await
    }

    /// Steps 3-5 of the acquisition algorithm: group-lock precedence,
    /// renewal, expiry-based reclamation, insert.
    async fn acquire(
        &self,
        conn: &mut PgConnection,
        user: &User,
        package: &Package,
    ) -> ServiceResult<()> {
        if let Some(group_lock) = GroupLockRepo::find_by_package(conn, package.package_id).await? {
            if !MembershipRepo::is_member(conn, user.user_id, group_lock.locked_by).await? {
                let group = UserGroupRepo::find_by_id(conn, group_lock.locked_by)
                    .await?
                    .map(|g| g.user_group_name)
                    .unwrap_or_else(|| "a group".to_string());
                return Err(CollabError::LockOwnedByAGroup {
                    package: package.package_name.clone(),
                    group,
                }
                .into());
            }
        }

        let now = Utc::now();
        if let Some(lock) = LockRepo::find_by_package(conn, package.package_id).await? {
            if lock.locked_by == user.user_id {
                // Sliding-window renewal; no new row.
                LockRepo::refresh(conn, lock.lock_id, now).await?;
                return Ok(());
            }
            if !is_expired(lock.timestamp, now, self.config.lock_timeout_mins) {
                let holder = holder_name(conn, lock.locked_by).await;
                return Err(CollabError::LockOwnedByAnotherUser {
                    package: package.package_name.clone(),
                    holder,
                }
                .into());
            }
            // Past the inactivity timeout: reclaim. The previous holder is
            // not notified; their next action finds the lock gone.
            LockRepo::delete(conn, lock.lock_id).await?;
            tracing::info!(
                package = %package.package_name,
                previous_holder = lock.locked_by,
                user = %user.user_login,
                "reclaimed expired lock"
            );
        }

        if LockRepo::try_insert(conn, package.package_id, user.user_id, now)
            .await?
            .is_none()
        {
            // Lost the insert race to a concurrent acquirer.
            let holder = match LockRepo::find_by_package(conn, package.package_id).await? {
                Some(lock) => holder_name(conn, lock.locked_by).await,
                None => "another user".to_string(),
            };
            return Err(CollabError::LockOwnedByAnotherUser {
                package: package.package_name.clone(),
                holder,
            }
            .into());
        }
        Ok(())
    }

    /// Release the user's lock, clear their active package, then
    /// opportunistically garbage-collect unreferenced packages.
    pub async fn close_package(&self, user_login: &str) -> ServiceResult<()> {
        soften(self.config.fail_soft, self.close_package_tx(user_login).await)
    }

    async fn close_package_tx(&self, user_login: &str) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match close_package_in(uow.conn(), user_login).await {
            Ok(()) => uow.commit().await?,
            Err(err) => {
                rollback_quietly(uow).await;
                return Err(err);
            }
        }
        // Outside the primary transaction: a GC failure must not undo the
        // close.
        collect_garbage(&self.pool).await;
        Ok(())
    }

    /// Voluntary release without closing the document; the user may still
    /// be looking at the collaboration summary page.
    pub async fn release_lock(
        &self,
        user_login: &str,
        owner_login: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.release_lock_tx(user_login, owner_login, package_name)
                .await,
        )
    }

    async fn release_lock_tx(
        &self,
        user_login: &str,
        owner_login: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match release_lock_in(uow.conn(), user_login, owner_login, package_name).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    /// Place a group lock on a package, evicting a non-member's individual
    /// lock.
    pub async fn add_group_lock(
        &self,
        owner_login: &str,
        package_name: &str,
        group_name: &str,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.add_group_lock_tx(owner_login, package_name, group_name)
                .await,
        )
    }

    async fn add_group_lock_tx(
        &self,
        owner_login: &str,
        package_name: &str,
        group_name: &str,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match add_group_lock_in(uow.conn(), owner_login, package_name, group_name).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    /// Remove a package's group lock and release every member's individual
    /// lock.
    pub async fn release_group_lock(
        &self,
        owner_login: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.release_group_lock_tx(owner_login, package_name).await,
        )
    }

    async fn release_group_lock_tx(
        &self,
        owner_login: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match release_group_lock_in(uow.conn(), owner_login, package_name).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    /// Lock state of a package relative to one viewer.
    pub async fn lock_status(
        &self,
        viewer_login: &str,
        owner_login: &str,
        package_name: &str,
    ) -> ServiceResult<LockStatus> {
        let mut conn = self.pool.acquire().await?;
        let conn = &mut *conn;
        let viewer = require_user(conn, viewer_login).await?;
        let Some(package) = resolve_package(conn, owner_login, package_name, false).await? else {
            return Ok(LockStatus::NotLocked);
        };
        let (status, _, _) = package_lock_view(conn, viewer.user_id, package.package_id).await?;
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Shared internals (also used by the collaboration graph)
// ---------------------------------------------------------------------------

async fn close_package_in(conn: &mut PgConnection, user_login: &str) -> ServiceResult<()> {
    let user = require_user(conn, user_login).await?;
    LockRepo::delete_by_holder(conn, user.user_id).await?;
    UserRepo::set_active_package(conn, user.user_id, None).await?;
    Ok(())
}

async fn release_lock_in(
    conn: &mut PgConnection,
    user_login: &str,
    owner_login: &str,
    package_name: &str,
) -> ServiceResult<()> {
    let user = require_user(conn, user_login).await?;
    if let Some(package) = resolve_package(conn, owner_login, package_name, false).await? {
        LockRepo::delete_by_package_and_holder(conn, package.package_id, user.user_id).await?;
    }
    Ok(())
}

async fn add_group_lock_in(
    conn: &mut PgConnection,
    owner_login: &str,
    package_name: &str,
    group_name: &str,
) -> ServiceResult<()> {
    let package = resolve_package(conn, owner_login, package_name, false)
        .await?
        .ok_or_else(|| {
            ServiceError::inconsistency(format!(
                "no package '{package_name}' owned by '{owner_login}'"
            ))
        })?;
    let group = UserGroupRepo::find_by_name(conn, group_name)
        .await?
        .ok_or_else(|| ServiceError::inconsistency(format!("unknown group '{group_name}'")))?;
    apply_group_lock(conn, &package, &group).await
}

/// Create the group lock if absent and evict a non-member's individual
/// lock. A lock held by a group member is left intact.
pub(crate) async fn apply_group_lock(
    conn: &mut PgConnection,
    package: &Package,
    group: &UserGroup,
) -> ServiceResult<()> {
    if GroupLockRepo::try_insert(conn, package.package_id, group.user_group_id)
        .await?
        .is_none()
    {
        // A group lock is already in place. If it belongs to another
        // group, leave it and its holder's lock alone.
        let existing = GroupLockRepo::find_by_package(conn, package.package_id).await?;
        if existing.map(|gl| gl.locked_by) != Some(group.user_group_id) {
            return Ok(());
        }
    }

    if let Some(lock) = LockRepo::find_by_package(conn, package.package_id).await? {
        if !MembershipRepo::is_member(conn, lock.locked_by, group.user_group_id).await? {
            LockRepo::delete(conn, lock.lock_id).await?;
            tracing::info!(
                package = %package.package_name,
                group = %group.user_group_name,
                evicted = lock.locked_by,
                "group lock evicted a non-member's lock"
            );
        }
    }
    Ok(())
}

async fn release_group_lock_in(
    conn: &mut PgConnection,
    owner_login: &str,
    package_name: &str,
) -> ServiceResult<()> {
    let Some(package) = resolve_package(conn, owner_login, package_name, false).await? else {
        return Ok(());
    };
    release_group_lock_on(conn, package.package_id).await
}

/// Delete the group lock, then release the individual lock of every
/// current member of the group.
pub(crate) async fn release_group_lock_on(
    conn: &mut PgConnection,
    package_id: DbId,
) -> ServiceResult<()> {
    if let Some(group_lock) = GroupLockRepo::find_by_package(conn, package_id).await? {
        GroupLockRepo::delete_by_package(conn, package_id).await?;
        let members = MembershipRepo::member_ids(conn, group_lock.locked_by).await?;
        if !members.is_empty() {
            LockRepo::delete_by_holders(conn, &members).await?;
        }
    }
    Ok(())
}

/// Lock state of a package relative to one viewer, with the display names
/// the presentation layer needs: `(status, holder_login, group_name)`.
pub(crate) async fn package_lock_view(
    conn: &mut PgConnection,
    viewer_id: DbId,
    package_id: DbId,
) -> ServiceResult<(LockStatus, Option<String>, Option<String>)> {
    let group_lock = GroupLockRepo::find_by_package(conn, package_id).await?;
    let lock = LockRepo::find_by_package(conn, package_id).await?;

    let group_name = match &group_lock {
        Some(gl) => UserGroupRepo::find_by_id(conn, gl.locked_by)
            .await?
            .map(|g| g.user_group_name),
        None => None,
    };
    let holder_login = match &lock {
        Some(l) if l.locked_by != viewer_id => UserRepo::find_by_id(conn, l.locked_by)
            .await?
            .map(|u| u.user_login),
        _ => None,
    };

    let status = LockStatus::derive(
        group_lock.is_some(),
        lock.as_ref().map(|l| l.locked_by == viewer_id),
    );
    Ok((status, holder_login, group_name))
}

/// Best-effort display name for a lock holder; never fails the primary
/// operation.
async fn holder_name(conn: &mut PgConnection, user_id: DbId) -> String {
    match UserRepo::find_by_id(conn, user_id).await {
        Ok(Some(user)) => user.user_login,
        Ok(None) => "another user".to_string(),
        Err(err) => {
            tracing::debug!(error = %err, "holder name lookup failed");
            "another user".to_string()
        }
    }
}

/// Delete packages with zero locks and zero collaborations. Best-effort:
/// runs on its own connection and swallows failures.
pub(crate) async fn collect_garbage(pool: &DbPool) {
    match pool.acquire().await {
        Ok(mut conn) => match PackageRepo::delete_orphaned(&mut conn).await {
            Ok(removed) if removed > 0 => {
                tracing::debug!(removed, "garbage-collected unreferenced packages");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "package garbage collection failed"),
        },
        Err(err) => tracing::warn!(error = %err, "package garbage collection failed"),
    }
}
