//! Process-local [`SignalStore`] for database-less runs and tests.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use beacon_core::{
    FunnelSummary, PersistenceError, Signal, SignalFilter, SignalStatus, SignalStore,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, Signal>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<Signal>, PersistenceError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(fingerprint).cloned())
    }

    async fn insert(&self, signal: &Signal) -> Result<(), PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        if rows.contains_key(&signal.fingerprint) {
            return Err(PersistenceError::Rejected(format!(
                "duplicate fingerprint {}",
                signal.fingerprint
            )));
        }
        rows.insert(signal.fingerprint.clone(), signal.clone());
        Ok(())
    }

    async fn record_observation(&self, signal: &Signal) -> Result<bool, PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(&signal.fingerprint) {
            Some(row) if !row.status.is_terminal() => {
                row.absorb_observation(signal);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_status(
        &self,
        signal: &Signal,
        expected: SignalStatus,
    ) -> Result<bool, PersistenceError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(&signal.fingerprint) {
            Some(row) if row.status == expected => {
                row.status = signal.status;
                row.revenue = signal.revenue;
                row.contacted_at = signal.contacted_at;
                row.won_at = signal.won_at;
                row.delivered_at = signal.delivered_at;
                row.closed_at = signal.closed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, filter: &SignalFilter) -> Result<Vec<Signal>, PersistenceError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<Signal> = rows
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        if let Some(limit) = filter.limit {
            matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(matched)
    }

    async fn funnel_summary(&self) -> Result<FunnelSummary, PersistenceError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut summary = FunnelSummary::default();
        for signal in rows.values() {
            *summary.counts.entry(signal.status).or_insert(0) += 1;
            if signal.status.accepts_revenue() {
                if let Some(revenue) = signal.revenue {
                    summary.revenue_total += revenue;
                }
            }
        }
        Ok(summary)
    }
}
