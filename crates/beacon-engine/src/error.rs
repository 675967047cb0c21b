use beacon_core::{InvalidTransitionError, PersistenceError, SignalStatus};
use thiserror::Error;

/// Failures of a dedup-gate operation.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error("no signal with fingerprint {0}")]
    NotFound(String),

    #[error("revenue cannot be recorded on a {0} signal")]
    RevenueNotAllowed(SignalStatus),

    #[error("revenue must not be negative")]
    NegativeRevenue,

    #[error("signal {0} kept changing status; transition not applied")]
    Conflict(String),
}

/// Fatal errors raised before the polling loop starts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no platform adapters available; nothing to poll")]
    NoAdapters,
}
