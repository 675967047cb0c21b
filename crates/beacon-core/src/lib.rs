//! Shared domain types and configuration for the beacon signal engine.
//!
//! Everything that more than one crate needs to agree on lives here: the
//! platform-agnostic [`IntermediateItem`], the durable [`Signal`] record and its
//! status funnel, per-adapter [`PlatformState`], the [`SignalStore`]
//! persistence capability, and the typed environment and sources-file config.

pub mod app_config;
pub mod config;
pub mod item;
pub mod platform_state;
pub mod signal;
pub mod sources;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, Credentials, Environment, RedditCredentials};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use item::{ExtraValue, IntermediateItem};
pub use platform_state::{AdapterHealth, PlatformState};
pub use signal::{Budget, BudgetCadence, InvalidTransitionError, Signal, SignalStatus};
pub use sources::{
    load_sources, parse_sources, FeedSourceConfig, GithubSourceConfig, HackerNewsSourceConfig,
    RedditSourceConfig, SourcesFile, TwitterSourceConfig, MAX_AGE_LIMIT_MINUTES,
};
pub use store::{FunnelSummary, PersistenceError, SignalFilter, SignalStore};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
