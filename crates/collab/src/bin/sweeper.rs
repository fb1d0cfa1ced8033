//! Standalone sweep entry point for external schedulers.
//!
//! With `SWEEP_INTERVAL_SECS` unset, runs one sweep and exits (cron
//! style). With it set, loops on that interval until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use packshare_collab::{seed, sweep, CollabConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packshare_collab=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let config = Arc::new(CollabConfig::from_env());

    let pool = packshare_db::create_pool(&database_url)
        .await
        .expect("database connection failed");
    packshare_db::health_check(&pool)
        .await
        .expect("database health check failed");

    seed::seed_groups(&pool, &config.group_seeds)
        .await
        .expect("group seeding failed");

    let interval_secs: Option<u64> = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .map(|v| v.parse().expect("SWEEP_INTERVAL_SECS must be a valid u64"));

    match interval_secs {
        None => {
            let report = sweep::cleanup_db(&pool, &config)
                .await
                .expect("sweep failed");
            tracing::info!(
                locks = report.locks_removed,
                packages = report.packages_removed,
                users = report.users_removed,
                "sweep finished"
            );
        }
        Some(secs) => {
            let cancel = CancellationToken::new();
            let task = tokio::spawn(sweep::run(
                pool.clone(),
                config.clone(),
                Duration::from_secs(secs),
                cancel.clone(),
            ));
            tokio::signal::ctrl_c().await.ok();
            cancel.cancel();
            task.await.ok();
        }
    }
}
