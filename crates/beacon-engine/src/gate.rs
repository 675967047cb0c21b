//! Dedup and persistence gate.
//!
//! Every write to the signal store goes through [`SignalGate`]: polling
//! results via [`SignalGate::admit`], dashboard status changes via
//! [`SignalGate::request_status_transition`]. Within a process both hold a
//! per-fingerprint lock across their read-then-write. Across processes
//! sharing a store, observations are merged by the store and status writes
//! only land if the status read beforehand is still current.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use beacon_core::{IntermediateItem, Signal, SignalStatus, SignalStore};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::GateError;
use crate::scorer::ScoreResult;

/// Title characters kept in log lines.
const LOG_TITLE_CHARS: usize = 80;

/// Prune dead lock entries once the map grows past this size.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// What [`SignalGate::admit`] did with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Created,
    Updated,
    /// The stored signal is in a terminal status and was left untouched.
    Rejected,
}

/// Deterministic dedup key for an observation.
///
/// Uses the platform's own identifier when there is one; otherwise falls
/// back to the case- and whitespace-normalised title.
#[must_use]
pub fn fingerprint(platform: &str, source_id: Option<&str>, title: &str) -> String {
    let input = match source_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{platform}\u{1f}id\u{1f}{id}"),
        None => {
            let normalized = title
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{platform}\u{1f}title\u{1f}{normalized}")
        }
    };
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

pub struct SignalGate {
    store: Arc<dyn SignalStore>,
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl SignalGate {
    #[must_use]
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    fn lock_for(&self, fingerprint: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = locks.get(fingerprint).and_then(Weak::upgrade) {
            return existing;
        }
        if locks.len() >= LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(fingerprint.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Admit a scored observation, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Persistence`] when the store fails.
    pub async fn admit(
        &self,
        platform: &str,
        item: &IntermediateItem,
        scored: &ScoreResult,
    ) -> Result<Admission, GateError> {
        self.admit_at(platform, item, scored, Utc::now()).await
    }

    /// Admit a scored observation seen at `now`.
    ///
    /// A new fingerprint creates a `new` signal. A known one gets `last_seen`
    /// advanced, the urgency score raised (never lowered), technologies and
    /// keywords unioned, and a budget filled in only if none was stored.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Persistence`] when the store fails.
    pub async fn admit_at(
        &self,
        platform: &str,
        item: &IntermediateItem,
        scored: &ScoreResult,
        now: DateTime<Utc>,
    ) -> Result<Admission, GateError> {
        let fp = fingerprint(platform, item.source_id.as_deref(), &item.title);
        let lock = self.lock_for(&fp);
        let _guard = lock.lock().await;

        let observed = new_signal(fp, platform, item, scored, now);
        let Some(existing) = self.store.get_by_fingerprint(&observed.fingerprint).await? else {
            self.store.insert(&observed).await?;
            tracing::info!(
                platform,
                score = observed.urgency_score,
                title = %preview(&observed.title),
                "gate: new signal"
            );
            return Ok(Admission::Created);
        };

        if existing.status.is_terminal() || !self.store.record_observation(&observed).await? {
            tracing::debug!(
                platform,
                fingerprint = %observed.fingerprint,
                "gate: closed signal re-observed"
            );
            return Ok(Admission::Rejected);
        }

        tracing::debug!(
            platform,
            fingerprint = %observed.fingerprint,
            previous_score = existing.urgency_score,
            score = existing.urgency_score.max(observed.urgency_score),
            "gate: signal re-observed"
        );
        Ok(Admission::Updated)
    }

    /// Dashboard entry point for funnel moves.
    ///
    /// # Errors
    ///
    /// See [`SignalGate::request_status_transition_at`].
    pub async fn request_status_transition(
        &self,
        fingerprint: &str,
        next: SignalStatus,
        revenue: Option<Decimal>,
    ) -> Result<Signal, GateError> {
        self.request_status_transition_at(fingerprint, next, revenue, Utc::now())
            .await
    }

    /// Validate and apply a status change, stamping the matching timestamp.
    ///
    /// # Errors
    ///
    /// - [`GateError::NotFound`] for an unknown fingerprint
    /// - [`GateError::NegativeRevenue`] / [`GateError::RevenueNotAllowed`] for
    ///   revenue that cannot be recorded on `next`
    /// - [`GateError::InvalidTransition`] for an out-of-order move
    /// - [`GateError::Conflict`] if the status keeps changing underneath
    /// - [`GateError::Persistence`] when the store fails
    pub async fn request_status_transition_at(
        &self,
        fingerprint: &str,
        next: SignalStatus,
        revenue: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Signal, GateError> {
        if let Some(amount) = revenue {
            if amount.is_sign_negative() {
                return Err(GateError::NegativeRevenue);
            }
            if !next.accepts_revenue() {
                return Err(GateError::RevenueNotAllowed(next));
            }
        }

        let lock = self.lock_for(fingerprint);
        let _guard = lock.lock().await;

        // Each lost race means the stored status moved forward, which can
        // happen at most once per status.
        for _ in 0..SignalStatus::ALL.len() {
            let current = self
                .store
                .get_by_fingerprint(fingerprint)
                .await?
                .ok_or_else(|| GateError::NotFound(fingerprint.to_string()))?;
            let from = current.status;
            let signal = apply_transition(current, next, revenue, now)?;

            if self.store.update_status(&signal, from).await? {
                tracing::info!(
                    fingerprint,
                    from = %from,
                    to = %next,
                    revenue = ?signal.revenue,
                    "gate: status transition"
                );
                return Ok(signal);
            }
            tracing::debug!(
                fingerprint,
                expected = %from,
                "gate: status changed underneath transition, rereading"
            );
        }
        Err(GateError::Conflict(fingerprint.to_string()))
    }
}

fn apply_transition(
    mut signal: Signal,
    next: SignalStatus,
    revenue: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<Signal, GateError> {
    signal.status = signal.status.transition(next)?;
    match next {
        SignalStatus::Contacted => signal.contacted_at = Some(now),
        SignalStatus::Won => {
            signal.won_at = Some(now);
            signal.closed_at = Some(now);
        }
        SignalStatus::Lost => signal.closed_at = Some(now),
        SignalStatus::Delivered => signal.delivered_at = Some(now),
        SignalStatus::New => {}
    }
    if revenue.is_some() {
        signal.revenue = revenue;
    }
    Ok(signal)
}

fn new_signal(
    fingerprint: String,
    platform: &str,
    item: &IntermediateItem,
    scored: &ScoreResult,
    now: DateTime<Utc>,
) -> Signal {
    Signal {
        fingerprint,
        platform: platform.to_string(),
        source_id: item.source_id.clone(),
        title: item.title.clone(),
        body: item.body.clone(),
        author: item.author.clone(),
        url: item.url.clone(),
        observed_at: item.observed_at,
        urgency_score: scored.urgency_score,
        technologies: scored.technologies.clone(),
        keywords: scored.keywords.clone(),
        budget: scored.budget,
        status: SignalStatus::New,
        first_seen: now,
        last_seen: now,
        revenue: None,
        contacted_at: None,
        won_at: None,
        delivered_at: None,
        closed_at: None,
    }
}

fn preview(title: &str) -> String {
    title.chars().take(LOG_TITLE_CHARS).collect()
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
