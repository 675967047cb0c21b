use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard-visible health of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterHealth {
    Healthy,
    /// Repeated transient failures; still polled, less often.
    Degraded,
    /// Configuration error; never polled again in this process.
    Disabled,
}

impl AdapterHealth {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdapterHealth::Healthy => "healthy",
            AdapterHealth::Degraded => "degraded",
            AdapterHealth::Disabled => "disabled",
        }
    }
}

impl std::str::FromStr for AdapterHealth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(AdapterHealth::Healthy),
            "degraded" => Ok(AdapterHealth::Degraded),
            "disabled" => Ok(AdapterHealth::Disabled),
            other => Err(format!("unknown adapter health '{other}'")),
        }
    }
}

impl std::fmt::Display for AdapterHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-adapter scheduling bookkeeping, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformState {
    pub platform: String,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// `None` once the adapter is disabled.
    pub next_allowed_at: Option<DateTime<Utc>>,
    pub health: AdapterHealth,
}

impl PlatformState {
    /// A fresh state that allows an immediate first poll.
    #[must_use]
    pub fn new(platform: &str, now: DateTime<Utc>) -> Self {
        Self {
            platform: platform.to_string(),
            last_success_at: None,
            last_error: None,
            consecutive_failures: 0,
            next_allowed_at: Some(now),
            health: AdapterHealth::Healthy,
        }
    }

    /// Whether a poll may start at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_allowed_at.is_some_and(|at| at <= now)
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.health == AdapterHealth::Disabled
    }
}
