use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Reddit script-app credentials for the client-credentials OAuth flow.
#[derive(Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Platform credentials read from the environment.
///
/// Every field is optional. An adapter that needs a credential which is absent
/// reports a configuration error on its first scan instead of failing startup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub reddit: Option<RedditCredentials>,
    pub twitter_bearer_token: Option<String>,
    /// Optional; raises the GitHub search rate limit when present.
    pub github_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("reddit", &self.reddit)
            .field(
                "twitter_bearer_token",
                &self.twitter_bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub backoff_cap_multiplier: u32,
    pub degraded_after_failures: u32,
    pub status_interval_secs: u64,
    pub credentials: Credentials,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("backoff_cap_multiplier", &self.backoff_cap_multiplier)
            .field("degraded_after_failures", &self.degraded_after_failures)
            .field("status_interval_secs", &self.status_interval_secs)
            .field("credentials", &self.credentials)
            .finish()
    }
}
