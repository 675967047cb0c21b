//! The polling loop.
//!
//! One [`AdapterRunner`] per adapter, each on its own tokio task, so a slow
//! platform never delays the others. A runner owns its [`PlatformState`] and
//! is the only thing that mutates it; the [`StatusBoard`] gets a copy after
//! every poll.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::{AdapterHealth, AppConfig, PersistenceError, PlatformState};
use beacon_sources::{FetchError, PlatformAdapter};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::backoff::BackoffPolicy;
use crate::error::{EngineError, GateError};
use crate::gate::{Admission, SignalGate};
use crate::scorer;
use crate::status::StatusBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on one `scan()`; exceeding it counts as a transient failure.
    pub scan_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(20),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            scan_timeout: Duration::from_secs(config.http_timeout_secs),
            backoff: BackoffPolicy::from_config(config),
        }
    }
}

/// Per-item outcome counts for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub rejected: usize,
    /// Items skipped because scoring or persisting them failed.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    NotDue,
    Disabled,
    Completed(BatchReport),
    /// Storage became unavailable; the rest of the batch was not processed.
    Aborted(BatchReport),
    Failed(FetchError),
}

pub struct AdapterRunner {
    adapter: Arc<dyn PlatformAdapter>,
    gate: Arc<SignalGate>,
    config: OrchestratorConfig,
    board: StatusBoard,
    state: PlatformState,
}

impl AdapterRunner {
    #[must_use]
    pub fn new(
        adapter: Arc<dyn PlatformAdapter>,
        gate: Arc<SignalGate>,
        config: OrchestratorConfig,
        board: StatusBoard,
        now: DateTime<Utc>,
    ) -> Self {
        let state = PlatformState::new(adapter.platform_name(), now);
        board.publish(&state);
        Self {
            adapter,
            gate,
            config,
            board,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> &PlatformState {
        &self.state
    }

    /// Scan the adapter if its next-allowed-poll time has come, then score
    /// and admit every item.
    pub async fn poll_if_due(&mut self, now: DateTime<Utc>) -> PollOutcome {
        if self.state.is_disabled() {
            return PollOutcome::Disabled;
        }
        if !self.state.is_due(now) {
            return PollOutcome::NotDue;
        }

        let platform = self.adapter.platform_name().to_string();
        let base = self.adapter.scan_interval();
        tracing::debug!(platform = %platform, "orchestrator: scanning");

        let scan = tokio::time::timeout(self.config.scan_timeout, self.adapter.scan()).await;
        let items = match scan {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => return self.on_fetch_error(e, base, now),
            Err(_) => {
                let e = FetchError::Transient(format!(
                    "scan timed out after {}s",
                    self.config.scan_timeout.as_secs()
                ));
                return self.on_fetch_error(e, base, now);
            }
        };

        let mut report = BatchReport {
            fetched: items.len(),
            ..BatchReport::default()
        };

        for item in &items {
            let scored = match scorer::score(item) {
                Ok(scored) => scored,
                Err(e) => {
                    tracing::warn!(
                        platform = %platform,
                        url = %item.url,
                        error = %e,
                        "orchestrator: skipping unscorable item"
                    );
                    report.failed += 1;
                    continue;
                }
            };
            match self.gate.admit_at(&platform, item, &scored, now).await {
                Ok(Admission::Created) => report.created += 1,
                Ok(Admission::Updated) => report.updated += 1,
                Ok(Admission::Rejected) => report.rejected += 1,
                Err(GateError::Persistence(e @ PersistenceError::Unavailable(_))) => {
                    tracing::error!(
                        platform = %platform,
                        error = %e,
                        processed = report.created + report.updated + report.rejected,
                        "orchestrator: storage unavailable, aborting batch"
                    );
                    self.config
                        .backoff
                        .record_unavailable(&mut self.state, base, now, &e.to_string());
                    self.board.publish(&self.state);
                    return PollOutcome::Aborted(report);
                }
                Err(e) => {
                    tracing::warn!(
                        platform = %platform,
                        url = %item.url,
                        error = %e,
                        "orchestrator: item not persisted"
                    );
                    report.failed += 1;
                }
            }
        }

        self.config
            .backoff
            .record_success(&mut self.state, base, now);
        self.board.publish(&self.state);
        tracing::info!(
            platform = %platform,
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            rejected = report.rejected,
            failed = report.failed,
            "orchestrator: scan complete"
        );
        PollOutcome::Completed(report)
    }

    fn on_fetch_error(
        &mut self,
        error: FetchError,
        base: Duration,
        now: DateTime<Utc>,
    ) -> PollOutcome {
        let platform = self.adapter.platform_name();
        let message = error.to_string();
        if error.is_configuration() {
            self.config
                .backoff
                .record_configuration(&mut self.state, &message);
            tracing::error!(
                platform,
                error = %message,
                "orchestrator: adapter disabled for this run"
            );
        } else {
            let was_degraded = self.state.health == AdapterHealth::Degraded;
            self.config
                .backoff
                .record_transient(&mut self.state, base, now, &message);
            tracing::warn!(
                platform,
                error = %message,
                failures = self.state.consecutive_failures,
                next_poll = ?self.state.next_allowed_at,
                "orchestrator: scan failed"
            );
            if !was_degraded && self.state.health == AdapterHealth::Degraded {
                tracing::warn!(platform, "orchestrator: adapter degraded");
            }
        }
        self.board.publish(&self.state);
        PollOutcome::Failed(error)
    }

    /// Time until the next allowed poll, or `None` once disabled.
    fn wait_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.state.next_allowed_at?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Poll on schedule until `shutdown` flips to `true` or the adapter is
    /// disabled. A poll already in flight is allowed to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.poll_if_due(Utc::now()).await;

            let Some(wait) = self.wait_from(Utc::now()) else {
                tracing::info!(
                    platform = %self.state.platform,
                    "orchestrator: runner stopped (adapter disabled)"
                );
                return;
            };
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(platform = %self.state.platform, "orchestrator: runner stopped");
    }
}

pub struct Orchestrator {
    runners: Vec<AdapterRunner>,
    board: StatusBoard,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`EngineError::NoAdapters`] when `adapters` is empty.
    pub fn new(
        adapters: Vec<Arc<dyn PlatformAdapter>>,
        gate: Arc<SignalGate>,
        config: OrchestratorConfig,
    ) -> Result<Self, EngineError> {
        if adapters.is_empty() {
            return Err(EngineError::NoAdapters);
        }
        let board = StatusBoard::new();
        let now = Utc::now();
        let runners = adapters
            .into_iter()
            .map(|adapter| {
                AdapterRunner::new(adapter, Arc::clone(&gate), config, board.clone(), now)
            })
            .collect();
        Ok(Self { runners, board })
    }

    #[must_use]
    pub fn status_board(&self) -> StatusBoard {
        self.board.clone()
    }

    /// Run every adapter on its own task until `shutdown` is signalled, then
    /// wait for in-flight polls to drain.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        tracing::info!(adapters = self.runners.len(), "orchestrator: starting");
        let handles: Vec<_> = self
            .runners
            .into_iter()
            .map(|runner| {
                let platform = runner.state().platform.clone();
                let handle = tokio::spawn(runner.run(shutdown.clone()));
                (platform, handle)
            })
            .collect();

        for (platform, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(
                    platform = %platform,
                    error = %e,
                    "orchestrator: runner task failed"
                );
            }
        }
        tracing::info!("orchestrator: all runners stopped");
    }
}
