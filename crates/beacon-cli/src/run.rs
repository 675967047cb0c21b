use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use beacon_core::{AppConfig, SignalStore};
use beacon_db::PgSignalStore;
use beacon_engine::{MemoryStore, Orchestrator, OrchestratorConfig, SignalGate};
use sqlx::PgPool;
use tokio::sync::watch;

use crate::platforms::discover;
use crate::scheduler::{build_heartbeat, stop_heartbeat};

async fn open_store(
    config: &AppConfig,
    memory: bool,
) -> anyhow::Result<(Arc<dyn SignalStore>, Option<PgPool>)> {
    if memory {
        tracing::warn!("run: using in-memory store, signals are lost on exit");
        return Ok((Arc::new(MemoryStore::new()), None));
    }

    let pool = beacon_db::connect_from_config(config)
        .await
        .context("failed to connect to database")?;
    let applied = beacon_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!(applied, "run: migrations complete");

    Ok((Arc::new(PgSignalStore::new(pool.clone())), Some(pool)))
}

pub(crate) async fn run_engine(config: &AppConfig, memory: bool) -> anyhow::Result<()> {
    tracing::info!(env = %config.env, sources = %config.sources_path.display(), "run: starting");

    let discovery = discover(config)?;
    for exclusion in &discovery.excluded {
        tracing::info!(
            platform = %exclusion.key,
            reason = %exclusion.reason,
            "run: adapter not in rotation"
        );
    }

    let (store, pool) = open_store(config, memory).await?;
    let gate = Arc::new(SignalGate::new(store));
    let orchestrator = Orchestrator::new(
        discovery.adapters,
        gate,
        OrchestratorConfig::from_app_config(config),
    )?;

    let board = orchestrator.status_board();
    let heartbeat = build_heartbeat(
        board.clone(),
        pool.clone(),
        Duration::from_secs(config.status_interval_secs),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = tokio::spawn(orchestrator.run(shutdown_rx));

    shutdown_signal().await;
    // Receivers may already be gone if every adapter was disabled.
    let _ = shutdown_tx.send(true);

    engine.await.context("orchestrator task failed")?;
    stop_heartbeat(heartbeat, &board, pool.as_ref()).await?;
    tracing::info!("run: stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
