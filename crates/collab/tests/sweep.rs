//! Integration tests for the periodic reclamation sweep.

use std::sync::Arc;

use packshare_collab::sweep::cleanup_db;
use packshare_collab::{CollabConfig, LeaseManager};
use sqlx::PgPool;

fn lease(pool: &PgPool) -> LeaseManager {
    LeaseManager::new(pool.clone(), Arc::new(CollabConfig::default()))
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

/// Backdate every lock in the store by the given number of minutes.
async fn age_all_locks(pool: &PgPool, minutes: i64) {
    sqlx::query("UPDATE \"lock\" SET \"timestamp\" = NOW() - ($1 || ' minutes')::interval")
        .bind(minutes.to_string())
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_reclaims_stale_locks_packages_and_users(pool: PgPool) {
    let config = CollabConfig::default();
    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();
    age_all_locks(&pool, 31).await;

    let report = cleanup_db(&pool, &config).await.unwrap();

    assert_eq!(report.locks_removed, 1);
    // With the lock gone the package is unreferenced, and with the
    // package gone so is alice.
    assert_eq!(report.packages_removed, 1);
    assert_eq!(report.users_removed, 1);

    assert_eq!(count(&pool, "\"lock\"").await, 0);
    assert_eq!(count(&pool, "package").await, 0);
    assert_eq!(count(&pool, "\"user\"").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_clears_the_evicted_holders_session(pool: PgPool) {
    let graph = packshare_collab::CollaborationGraph::new(
        pool.clone(),
        Arc::new(CollabConfig::default()),
    );
    let created = graph
        .create_invitation(
            "alice",
            "birds",
            "alice",
            "alice@example.org",
            "Bob",
            "bob@example.org",
        )
        .await
        .unwrap();
    graph.accept_invitation("bob", &created.code).await.unwrap();

    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();
    age_all_locks(&pool, 45).await;

    let report = cleanup_db(&pool, &CollabConfig::default()).await.unwrap();

    assert_eq!(report.locks_removed, 1);
    // The collaboration keeps the package (and with it both users) alive;
    // only the stale lease and the holder's session pointer go.
    assert_eq!(report.packages_removed, 0);
    assert_eq!(report.users_removed, 0);
    let active: (Option<i64>,) =
        sqlx::query_as("SELECT active_package_id FROM \"user\" WHERE user_login = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(active.0.is_none(), "evicted holder's session must be cleared");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_leaves_fresh_state_alone(pool: PgPool) {
    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();

    let report = cleanup_db(&pool, &CollabConfig::default()).await.unwrap();

    assert_eq!(report.locks_removed, 0);
    assert_eq!(report.packages_removed, 0);
    assert_eq!(report.users_removed, 0);
    assert_eq!(count(&pool, "\"lock\"").await, 1);
}
