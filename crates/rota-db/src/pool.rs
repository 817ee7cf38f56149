use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/rota-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a connection pool for the scheduler.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    Ok(pool)
}

/// Run all pending embedded migrations against the pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!("migrations applied successfully");
    Ok(())
}

/// Ensure the target database exists, creating it through the `postgres`
/// maintenance database when it is absent.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    check_database_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| {
            format!("failed to connect to maintenance database at {maintenance_url}")
        })?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    if exists {
        info!(db = db_name, "database already exists");
    } else {
        // CREATE DATABASE cannot take a bind parameter.
        let stmt = format!("CREATE DATABASE {db_name}");
        maint_pool
            .execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    maint_pool.close().await;
    Ok(())
}

fn check_database_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("database name {name:?} contains invalid characters");
    }
    Ok(())
}

/// What a rota database currently holds, as printed by `rota db-init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ScheduleSummary {
    pub exercises: i64,
    pub plans: i64,
    /// Visible rows, plan-generated and ad hoc.
    pub instances: i64,
    pub completed: i64,
    pub ad_hoc: i64,
    /// Hidden rows marking vacated plan occurrences.
    pub tombstones: i64,
}

/// Count the catalog, plans and materialized schedule in one round trip.
pub async fn schedule_summary(pool: &PgPool) -> Result<ScheduleSummary> {
    sqlx::query_as::<_, ScheduleSummary>(
        "SELECT \
             (SELECT COUNT(*) FROM exercises) AS exercises, \
             (SELECT COUNT(*) FROM workout_plans) AS plans, \
             COUNT(*) FILTER (WHERE NOT is_hidden) AS instances, \
             COUNT(*) FILTER (WHERE NOT is_hidden AND completed) AS completed, \
             COUNT(*) FILTER (WHERE NOT is_hidden AND workout_plan_id IS NULL) AS ad_hoc, \
             COUNT(*) FILTER (WHERE is_hidden) AS tombstones \
         FROM scheduled_instances",
    )
    .fetch_one(pool)
    .await
    .context("failed to summarize schedule")
}
