use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use beacon_core::PlatformState;

/// Shared read view of every runner's [`PlatformState`].
///
/// Runners publish a copy after each poll; the heartbeat and the CLI read
/// snapshots. Only the orchestrator writes.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    states: Arc<RwLock<BTreeMap<String, PlatformState>>>,
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, state: &PlatformState) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        states.insert(state.platform.clone(), state.clone());
    }

    /// All states, ordered by platform name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PlatformState> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, platform: &str) -> Option<PlatformState> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.get(platform).cloned()
    }

    /// `(running, total)`, where running means not disabled.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        let running = states.values().filter(|s| !s.is_disabled()).count();
        (running, states.len())
    }
}
