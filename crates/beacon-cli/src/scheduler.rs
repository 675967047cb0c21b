//! Status heartbeat.
//!
//! A repeated job that logs how many adapters are still in rotation and, when
//! a database is attached, writes every adapter's latest state to
//! `platform_status` for the dashboard.

use std::time::Duration;

use beacon_engine::StatusBoard;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the heartbeat scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the engine.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler cannot be started.
pub(crate) async fn build_heartbeat(
    board: StatusBoard,
    pool: Option<PgPool>,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let board = board.clone();
        let pool = pool.clone();
        Box::pin(async move {
            beat(&board, pool.as_ref()).await;
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: heartbeat registered"
    );
    Ok(scheduler)
}

/// Writes one last heartbeat from the drained board, then stops the scheduler.
///
/// Call after every runner has exited so `platform_status` keeps each
/// adapter's final state rather than the one from the last tick.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
pub(crate) async fn stop_heartbeat(
    mut scheduler: JobScheduler,
    board: &StatusBoard,
    pool: Option<&PgPool>,
) -> Result<(), JobSchedulerError> {
    beat(board, pool).await;
    scheduler.shutdown().await
}

async fn beat(board: &StatusBoard, pool: Option<&PgPool>) {
    let (running, total) = board.counts();
    tracing::info!(running, total, "scheduler: heartbeat");

    let Some(pool) = pool else {
        return;
    };
    for state in board.snapshot() {
        if let Err(e) = beacon_db::upsert_platform_status(pool, &state).await {
            tracing::warn!(
                platform = %state.platform,
                error = %e,
                "scheduler: failed to persist platform status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{AdapterHealth, PlatformState};
    use chrono::Utc;

    use super::*;

    fn degraded_board() -> StatusBoard {
        let board = StatusBoard::new();
        let mut state = PlatformState::new("reddit", Utc::now());
        state.health = AdapterHealth::Degraded;
        state.consecutive_failures = 3;
        state.last_error = Some("HTTP 503".to_string());
        board.publish(&state);
        board
    }

    #[tokio::test]
    async fn stop_without_database_only_logs() {
        let board = degraded_board();
        let scheduler = build_heartbeat(board.clone(), None, Duration::from_secs(3600))
            .await
            .expect("scheduler starts");
        stop_heartbeat(scheduler, &board, None)
            .await
            .expect("scheduler stops");
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn stop_persists_final_state(pool: PgPool) {
        let board = degraded_board();
        // Long interval: only the final beat can write the row.
        let scheduler = build_heartbeat(
            board.clone(),
            Some(pool.clone()),
            Duration::from_secs(3600),
        )
        .await
        .expect("scheduler starts");
        assert!(beacon_db::list_platform_status(&pool).await.unwrap().is_empty());

        stop_heartbeat(scheduler, &board, Some(&pool))
            .await
            .expect("scheduler stops");

        let rows = beacon_db::list_platform_status(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform, "reddit");
        assert_eq!(rows[0].health, "degraded");
        assert_eq!(rows[0].consecutive_failures, 3);
        assert_eq!(rows[0].last_error.as_deref(), Some("HTTP 503"));
    }
}
