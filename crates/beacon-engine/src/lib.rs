//! Scoring, dedup and scheduling for the beacon signal engine.
//!
//! Adapters from `beacon-sources` feed [`Orchestrator`], which passes each
//! item through [`score`] and then [`SignalGate::admit`]. The gate is the
//! only writer to the [`beacon_core::SignalStore`].

pub mod backoff;
pub mod error;
pub mod gate;
pub mod memory_store;
pub mod orchestrator;
pub mod scorer;
pub mod status;

pub use backoff::BackoffPolicy;
pub use error::{EngineError, GateError};
pub use gate::{fingerprint, Admission, SignalGate};
pub use memory_store::MemoryStore;
pub use orchestrator::{AdapterRunner, BatchReport, Orchestrator, OrchestratorConfig, PollOutcome};
pub use scorer::{extract_budget, extract_technologies, score, ScoreResult, ScoringError};
pub use status::StatusBoard;
