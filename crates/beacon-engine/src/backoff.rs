//! Failure bookkeeping for [`PlatformState`].

use std::time::Duration;

use beacon_core::{AdapterHealth, AppConfig, PlatformState};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Longest wait, as a multiple of the adapter's base interval.
    pub cap_multiplier: u32,
    /// Consecutive transient failures before an adapter shows as degraded.
    pub degraded_after: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            cap_multiplier: 30,
            degraded_after: 3,
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cap_multiplier: config.backoff_cap_multiplier,
            degraded_after: config.degraded_after_failures,
        }
    }

    /// Wait after `failures` consecutive transient failures: `base × 2ⁿ`,
    /// capped at `base × cap_multiplier`.
    #[must_use]
    pub fn delay(&self, base: Duration, failures: u32) -> Duration {
        let cap = self.cap_multiplier.max(1);
        let factor = 2_u32.checked_pow(failures).map_or(cap, |f| f.min(cap));
        base.saturating_mul(factor)
    }

    pub fn record_success(&self, state: &mut PlatformState, base: Duration, now: DateTime<Utc>) {
        state.last_success_at = Some(now);
        state.consecutive_failures = 0;
        state.health = AdapterHealth::Healthy;
        state.next_allowed_at = Some(after(now, base));
    }

    pub fn record_transient(
        &self,
        state: &mut PlatformState,
        base: Duration,
        now: DateTime<Utc>,
        error: &str,
    ) {
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_error = Some(error.to_string());
        if state.consecutive_failures >= self.degraded_after {
            state.health = AdapterHealth::Degraded;
        }
        state.next_allowed_at = Some(after(now, self.delay(base, state.consecutive_failures)));
    }

    /// Disable for the rest of the process lifetime.
    pub fn record_configuration(&self, state: &mut PlatformState, error: &str) {
        state.last_error = Some(error.to_string());
        state.health = AdapterHealth::Disabled;
        state.next_allowed_at = None;
    }

    /// Storage went away mid-batch: retry the whole adapter one base interval
    /// later. Failure counter and health are left alone.
    pub fn record_unavailable(
        &self,
        state: &mut PlatformState,
        base: Duration,
        now: DateTime<Utc>,
        error: &str,
    ) {
        state.last_error = Some(error.to_string());
        state.next_allowed_at = Some(after(now, base));
    }
}

/// `now + delay`, saturating at the latest representable instant.
#[must_use]
pub fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
