//! Postgres persistence for signals and adapter status.

use std::time::Duration;

use beacon_core::{AppConfig, PersistenceError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod platform_status;
pub mod signals;

pub use platform_status::{list_platform_status, upsert_platform_status, PlatformStatusRow};
pub use signals::{
    funnel_summary, get_signal_by_fingerprint, insert_signal, list_signals, record_observation,
    update_signal_status, PgSignalStore, SignalRow,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/beacon-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("invalid stored value: {0}")]
    Decode(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// SQLSTATE classes that mean the server, not the row, is the problem:
/// connection exceptions, insufficient resources, operator intervention.
const UNAVAILABLE_SQLSTATE_PREFIXES: &[&str] = &["08", "53", "57P"];

impl From<DbError> for PersistenceError {
    fn from(err: DbError) -> Self {
        let message = err.to_string();
        match err {
            DbError::Decode(_) => PersistenceError::Rejected(message),
            DbError::Sqlx(sqlx::Error::Database(db)) => {
                let unavailable = db.code().is_some_and(|code| {
                    UNAVAILABLE_SQLSTATE_PREFIXES
                        .iter()
                        .any(|prefix| code.starts_with(prefix))
                });
                if unavailable {
                    PersistenceError::Unavailable(message)
                } else {
                    PersistenceError::Rejected(message)
                }
            }
            DbError::Sqlx(
                sqlx::Error::RowNotFound
                | sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::Decode(_)
                | sqlx::Error::Encode(_)
                | sqlx::Error::TypeNotFound { .. },
            ) => PersistenceError::Rejected(message),
            DbError::MissingDatabaseUrl | DbError::Sqlx(_) | DbError::Migration(_) => {
                PersistenceError::Unavailable(message)
            }
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect using the `DATABASE_URL` and pool settings from [`AppConfig`].
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if no URL is configured, or
/// [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_from_config(config: &AppConfig) -> Result<PgPool, DbError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(DbError::MissingDatabaseUrl)?;
    Ok(connect_pool(url, PoolConfig::from_app_config(config)).await?)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database.
    let applied_before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let applied_after = applied_migrations(pool).await;

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

async fn applied_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
