//! Persistence capability required by the dedup gate and the dashboard read API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::signal::{Signal, SignalStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Storage cannot be reached; the current batch must stop.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Storage refused this one record (constraint violation, bad encoding).
    #[error("storage rejected record: {0}")]
    Rejected(String),
}

impl PersistenceError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PersistenceError::Unavailable(_))
    }
}

/// Dashboard read filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalFilter {
    pub status: Option<SignalStatus>,
    pub platform: Option<String>,
    pub min_score: Option<u8>,
    pub limit: Option<u32>,
}

impl SignalFilter {
    #[must_use]
    pub fn matches(&self, signal: &Signal) -> bool {
        self.status.is_none_or(|s| s == signal.status)
            && self
                .platform
                .as_deref()
                .is_none_or(|p| p == signal.platform)
            && self.min_score.is_none_or(|min| signal.urgency_score >= min)
    }
}

/// Per-status counts and realised revenue for the funnel view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunnelSummary {
    pub counts: BTreeMap<SignalStatus, u64>,
    pub revenue_total: Decimal,
}

impl FunnelSummary {
    #[must_use]
    pub fn count(&self, status: SignalStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Row store keyed by fingerprint.
///
/// Several processes may share one store, so neither write may blindly
/// overwrite a row read earlier: observations merge, and status writes are
/// conditional on the status the caller read.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn get_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<Signal>, PersistenceError>;

    /// Insert a new row. A duplicate fingerprint is [`PersistenceError::Rejected`].
    async fn insert(&self, signal: &Signal) -> Result<(), PersistenceError>;

    /// Merge a re-observation into the stored row as
    /// [`Signal::absorb_observation`] does, in one atomic step.
    ///
    /// Never writes status, revenue or status timestamps. Returns `false`
    /// when no row with this fingerprint is still `new` or `contacted`.
    async fn record_observation(&self, signal: &Signal) -> Result<bool, PersistenceError>;

    /// Write status, revenue and status timestamps, but only while the
    /// stored status is still `expected`. Returns `false` when it is not,
    /// including when the row is gone.
    async fn update_status(
        &self,
        signal: &Signal,
        expected: SignalStatus,
    ) -> Result<bool, PersistenceError>;

    /// Newest-first by `last_seen`.
    async fn list(&self, filter: &SignalFilter) -> Result<Vec<Signal>, PersistenceError>;

    async fn funnel_summary(&self) -> Result<FunnelSummary, PersistenceError>;
}
