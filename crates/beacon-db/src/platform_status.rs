//! Database operations for the `platform_status` table.

use beacon_core::{AdapterHealth, PlatformState};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `platform_status` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformStatusRow {
    pub platform: String,
    pub health: String,
    pub consecutive_failures: i32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_allowed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlatformStatusRow> for PlatformState {
    type Error = DbError;

    fn try_from(row: PlatformStatusRow) -> Result<Self, Self::Error> {
        Ok(PlatformState {
            health: row.health.parse::<AdapterHealth>().map_err(DbError::Decode)?,
            consecutive_failures: u32::try_from(row.consecutive_failures).map_err(|_| {
                DbError::Decode(format!(
                    "consecutive_failures {}",
                    row.consecutive_failures
                ))
            })?,
            platform: row.platform,
            last_success_at: row.last_success_at,
            next_allowed_at: row.next_allowed_at,
            last_error: row.last_error,
        })
    }
}

/// Insert or replace the status row for one adapter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_platform_status(pool: &PgPool, state: &PlatformState) -> Result<(), DbError> {
    let failures = i32::try_from(state.consecutive_failures).unwrap_or(i32::MAX);
    sqlx::query(
        "INSERT INTO platform_status \
             (platform, health, consecutive_failures, last_success_at, next_allowed_at, last_error) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (platform) DO UPDATE SET \
             health = EXCLUDED.health, \
             consecutive_failures = EXCLUDED.consecutive_failures, \
             last_success_at = EXCLUDED.last_success_at, \
             next_allowed_at = EXCLUDED.next_allowed_at, \
             last_error = EXCLUDED.last_error, \
             updated_at = NOW()",
    )
    .bind(&state.platform)
    .bind(state.health.as_str())
    .bind(failures)
    .bind(state.last_success_at)
    .bind(state.next_allowed_at)
    .bind(state.last_error.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// All status rows, ordered by platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_platform_status(pool: &PgPool) -> Result<Vec<PlatformStatusRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformStatusRow>(
        "SELECT platform, health, consecutive_failures, last_success_at, next_allowed_at, \
                last_error, updated_at \
         FROM platform_status \
         ORDER BY platform",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
