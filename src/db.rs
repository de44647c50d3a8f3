use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DbConnectConfig;

/// Runs `connect` until it succeeds or `max_attempts` tries have failed,
/// sleeping `delay` between tries.
pub async fn retry_connect<T, E, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    mut connect: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match connect().await {
            Ok(v) => {
                info!(attempt, "database connected");
                return Ok(v);
            }
            Err(e) if attempt < max_attempts => {
                warn!(error = %e, attempt, max_attempts, "database connect failed; retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                anyhow::bail!("database connect failed after {attempt} attempts: {e}");
            }
        }
    }
}

pub async fn connect(database_url: &str, policy: &DbConnectConfig) -> anyhow::Result<PgPool> {
    let db = retry_connect(policy.max_attempts, policy.retry_delay(), || {
        PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
    })
    .await
    .context("connect to database")?;

    run_migrations(&db).await?;
    Ok(db)
}

/// Applies the embedded migrations. A failure here aborts boot.
pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    info!("migrations applied");
    Ok(())
}
