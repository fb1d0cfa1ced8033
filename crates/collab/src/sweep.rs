//! Periodic reclamation sweep.
//!
//! Removes expired locks (clearing their holders' active-package
//! pointers), unreferenced packages, and unreferenced users. Scheduling is
//! an external responsibility: call [`cleanup_db`] from a cron-style
//! scheduler, or spawn [`run`] for an in-process interval loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use packshare_core::types::DbId;
use packshare_db::repositories::{LockRepo, PackageRepo, UserRepo};
use packshare_db::uow::UnitOfWork;
use packshare_db::DbPool;
use sqlx::PgConnection;
use tokio_util::sync::CancellationToken;

use crate::config::CollabConfig;
use crate::error::{rollback_quietly, soften, ServiceResult};

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub locks_removed: u64,
    pub packages_removed: u64,
    pub users_removed: u64,
}

impl CleanupReport {
    fn is_empty(&self) -> bool {
        self.locks_removed == 0 && self.packages_removed == 0 && self.users_removed == 0
    }
}

/// Run one sweep inside a unit of work.
pub async fn cleanup_db(pool: &DbPool, config: &CollabConfig) -> ServiceResult<CleanupReport> {
    soften(config.fail_soft, cleanup_tx(pool, config).await)
}

async fn cleanup_tx(pool: &DbPool, config: &CollabConfig) -> ServiceResult<CleanupReport> {
    let mut uow = UnitOfWork::begin(pool).await?;
    let report = match cleanup_in(uow.conn(), config.lock_timeout_mins).await {
        Ok(report) => {
            uow.commit().await?;
            report
        }
        Err(err) => {
            rollback_quietly(uow).await;
            return Err(err);
        }
    };
    if !report.is_empty() {
        tracing::info!(
            locks = report.locks_removed,
            packages = report.packages_removed,
            users = report.users_removed,
            "sweep reclaimed stale rows"
        );
    }
    Ok(report)
}

async fn cleanup_in(conn: &mut PgConnection, timeout_mins: i64) -> ServiceResult<CleanupReport> {
    let cutoff = Utc::now() - chrono::Duration::minutes(timeout_mins);

    let expired = LockRepo::delete_expired(conn, cutoff).await?;
    if !expired.is_empty() {
        let holders: Vec<DbId> = expired.iter().map(|lock| lock.locked_by).collect();
        UserRepo::clear_active_package(conn, &holders).await?;
    }

    let packages_removed = PackageRepo::delete_orphaned(conn).await?;
    let users_removed = UserRepo::delete_unreferenced(conn).await?;

    Ok(CleanupReport {
        locks_removed: expired.len() as u64,
        packages_removed,
        users_removed,
    })
}

/// Run the sweep on a fixed interval until cancelled.
pub async fn run(
    pool: DbPool,
    config: Arc<CollabConfig>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        timeout_mins = config.lock_timeout_mins,
        "lease sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("lease sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = cleanup_db(&pool, &config).await {
                    tracing::error!(error = %err, "lease sweep failed");
                }
            }
        }
    }
}
