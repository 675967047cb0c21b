use crate::app_config::{AppConfig, Credentials, Environment, RedditCredentials};
use crate::ConfigError;

const DEFAULT_REDDIT_USER_AGENT: &str = "beacon/0.1 (by u/beacon-monitor)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let positive_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("BEACON_ENV", "development"))?;
    let log_level = or_default("BEACON_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("BEACON_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections = parse_u32("BEACON_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BEACON_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BEACON_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = positive_u64("BEACON_HTTP_TIMEOUT_SECS", "20")?;
    let http_user_agent = or_default("BEACON_HTTP_USER_AGENT", "beacon/0.1 (signal-monitor)");
    let backoff_cap_multiplier = positive_u32("BEACON_BACKOFF_CAP_MULTIPLIER", "30")?;
    let degraded_after_failures = positive_u32("BEACON_DEGRADED_AFTER_FAILURES", "3")?;
    let status_interval_secs = positive_u64("BEACON_STATUS_INTERVAL_SECS", "30")?;

    let reddit = match (optional("REDDIT_CLIENT_ID"), optional("REDDIT_CLIENT_SECRET")) {
        (Some(client_id), Some(client_secret)) => Some(RedditCredentials {
            client_id,
            client_secret,
            user_agent: or_default("REDDIT_USER_AGENT", DEFAULT_REDDIT_USER_AGENT),
        }),
        _ => None,
    };

    let credentials = Credentials {
        reddit,
        twitter_bearer_token: optional("TWITTER_BEARER_TOKEN"),
        github_token: optional("GITHUB_TOKEN"),
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        backoff_cap_multiplier,
        degraded_after_failures,
        status_interval_secs,
        credentials,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BEACON_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
