//! Adapter discovery.
//!
//! Adapters are contributed through an explicit registration list rather
//! than runtime scanning: each built-in platform module registers a factory
//! in [`crate::adapters::register_builtin`], and embedders can call
//! [`Registry::register`] for their own platforms. Discovery instantiates
//! every enabled factory and validates the metadata the orchestrator relies
//! on, excluding bad adapters with a reason instead of failing as a whole.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use beacon_core::{AppConfig, Credentials, SourcesFile};
use reqwest::Client;
use thiserror::Error;

use crate::adapter::PlatformAdapter;
use crate::adapters;
use crate::error::FetchError;
use crate::http::build_client;

/// Everything a factory may need to build its adapter.
#[derive(Clone)]
pub struct AdapterContext {
    pub client: Client,
    pub credentials: Credentials,
    pub sources: SourcesFile,
}

impl AdapterContext {
    /// Build the shared HTTP client from application settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, sources: SourcesFile) -> Result<Self, FetchError> {
        let client = build_client(
            Duration::from_secs(config.http_timeout_secs),
            &config.http_user_agent,
        )?;
        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            sources,
        })
    }
}

impl fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterContext")
            .field("credentials", &self.credentials)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

type Factory = Box<dyn Fn(&AdapterContext) -> Arc<dyn PlatformAdapter> + Send + Sync>;

struct Registration {
    key: String,
    factory: Factory,
}

/// Why a registered adapter did not make it into the rotation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExclusionReason {
    #[error("disabled in sources file")]
    Disabled,

    #[error("adapter reports an empty platform name")]
    MissingPlatformName,

    #[error("adapter reports a zero scan interval")]
    MissingScanInterval,

    #[error("platform '{0}' is already provided by another adapter")]
    DuplicatePlatform(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    /// Registration key the adapter was registered under.
    pub key: String,
    pub reason: ExclusionReason,
}

/// Result of [`Registry::discover`].
#[derive(Default)]
pub struct Discovery {
    pub adapters: Vec<Arc<dyn PlatformAdapter>>,
    pub excluded: Vec<Exclusion>,
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.adapters.iter().map(|a| a.platform_name()).collect();
        f.debug_struct("Discovery")
            .field("adapters", &names)
            .field("excluded", &self.excluded)
            .finish()
    }
}

#[derive(Default)]
pub struct Registry {
    registrations: Vec<Registration>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with every built-in platform.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        adapters::register_builtin(&mut registry);
        registry
    }

    /// Add an adapter factory under `key`, the name of its sources-file section.
    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn(&AdapterContext) -> Arc<dyn PlatformAdapter> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            key: key.to_string(),
            factory: Box::new(factory),
        });
    }

    /// Registration keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.key.as_str())
    }

    /// Instantiate every enabled adapter and validate its metadata.
    #[must_use]
    pub fn discover(&self, ctx: &AdapterContext) -> Discovery {
        let mut discovery = Discovery::default();
        let mut seen = HashSet::new();

        for registration in &self.registrations {
            let key = registration.key.as_str();
            if !ctx.sources.is_enabled(key) {
                tracing::info!(platform = key, "registry: adapter disabled");
                discovery.excluded.push(Exclusion {
                    key: key.to_string(),
                    reason: ExclusionReason::Disabled,
                });
                continue;
            }

            let adapter = (registration.factory)(ctx);
            if let Err(reason) = validate(adapter.as_ref(), &seen) {
                tracing::warn!(platform = key, reason = %reason, "registry: adapter excluded");
                discovery.excluded.push(Exclusion {
                    key: key.to_string(),
                    reason,
                });
                continue;
            }

            seen.insert(adapter.platform_name().to_string());
            tracing::info!(
                platform = adapter.platform_name(),
                interval_secs = adapter.scan_interval().as_secs(),
                requires_auth = adapter.requires_auth(),
                "registry: adapter discovered"
            );
            discovery.adapters.push(adapter);
        }

        discovery
    }
}

fn validate(
    adapter: &dyn PlatformAdapter,
    seen: &HashSet<String>,
) -> Result<(), ExclusionReason> {
    let name = adapter.platform_name().trim();
    if name.is_empty() {
        return Err(ExclusionReason::MissingPlatformName);
    }
    if adapter.scan_interval().is_zero() {
        return Err(ExclusionReason::MissingScanInterval);
    }
    if seen.contains(name) {
        return Err(ExclusionReason::DuplicatePlatform(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
