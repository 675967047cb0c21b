use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{IntermediateItem, MAX_AGE_LIMIT_MINUTES};

use crate::error::FetchError;

/// Colour shown for adapters that do not pick their own.
pub const DEFAULT_DISPLAY_COLOR: &str = "#666666";

/// The one capability a platform implements to be polled.
///
/// The orchestrator depends only on this trait. `scan()` performs at most
/// one batch of network calls, never touches storage, and reports failures
/// through [`FetchError`] rather than panicking.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Stable platform id, also the first half of every fingerprint.
    fn platform_name(&self) -> &str;

    fn requires_auth(&self) -> bool;

    /// Minimum time between two scans.
    fn scan_interval(&self) -> Duration;

    /// Dashboard metadata only.
    fn display_color(&self) -> &str {
        DEFAULT_DISPLAY_COLOR
    }

    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError>;
}

/// Apply a configured interval override, which may raise but never lower
/// the adapter's own minimum.
#[must_use]
pub fn effective_interval(minimum_secs: u64, configured_secs: Option<u64>) -> Duration {
    Duration::from_secs(configured_secs.map_or(minimum_secs, |c| c.max(minimum_secs)))
}

/// Age window for a configured `max_age_minutes`, clamped to
/// [`MAX_AGE_LIMIT_MINUTES`] so an unchecked value cannot overflow.
#[must_use]
pub fn max_age_window(minutes: u64) -> chrono::TimeDelta {
    i64::try_from(minutes.min(MAX_AGE_LIMIT_MINUTES))
        .map_or(chrono::TimeDelta::zero(), chrono::TimeDelta::minutes)
}

/// Truncate to at most `limit` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_interval_cannot_undercut_minimum() {
        assert_eq!(effective_interval(300, Some(60)), Duration::from_secs(300));
    }

    #[test]
    fn configured_interval_may_raise_minimum() {
        assert_eq!(effective_interval(300, Some(900)), Duration::from_secs(900));
    }

    #[test]
    fn missing_override_uses_minimum() {
        assert_eq!(effective_interval(600, None), Duration::from_secs(600));
    }

    #[test]
    fn max_age_window_is_clamped() {
        assert_eq!(max_age_window(120), chrono::TimeDelta::minutes(120));
        assert_eq!(
            max_age_window(1_000_000_000_000_000),
            chrono::TimeDelta::days(30)
        );
    }

    #[test]
    fn truncate_respects_multibyte_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
