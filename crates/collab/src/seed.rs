//! Startup seeding of the static group membership table.

use packshare_core::error::CollabError;
use packshare_db::repositories::MembershipRepo;
use packshare_db::uow::UnitOfWork;
use packshare_db::DbPool;
use sqlx::PgConnection;

use crate::config::GroupSeed;
use crate::error::{rollback_quietly, ServiceResult};
use crate::registry::{resolve_group, resolve_user};

/// Apply the configured group -> members table. Idempotent: existing
/// groups, users, and memberships are left untouched, so this runs safely
/// on every process start.
pub async fn seed_groups(pool: &DbPool, seeds: &[GroupSeed]) -> ServiceResult<()> {
    if seeds.is_empty() {
        return Ok(());
    }
    let mut uow = UnitOfWork::begin(pool).await?;
    match seed_in(uow.conn(), seeds).await {
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

async fn seed_in(conn: &mut PgConnection, seeds: &[GroupSeed]) -> ServiceResult<()> {
    for seed in seeds {
        let group = resolve_group(conn, &seed.name).await?;
        for login in &seed.members {
            let user = resolve_user(conn, login, true)
                .await?
                .ok_or_else(|| CollabError::UserNotFound(login.clone()))?;
            MembershipRepo::add(conn, user.user_id, group.user_group_id).await?;
        }
        tracing::info!(
            group = %seed.name,
            members = seed.members.len(),
            "seeded collaboration group"
        );
    }
    Ok(())
}
