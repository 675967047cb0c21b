//! Typed per-platform settings loaded from `config/sources.yaml`.
//!
//! Each recognised platform has its own section with explicit fields; unknown
//! keys are rejected so a typo fails at startup rather than silently
//! disabling an option. Empty lists mean "use the adapter's built-in
//! defaults".

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Upper bound for any `max_age_minutes` setting (30 days).
pub const MAX_AGE_LIMIT_MINUTES: u64 = 30 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedditSourceConfig {
    pub enabled: bool,
    pub scan_interval_secs: Option<u64>,
    pub max_age_minutes: Option<u64>,
    pub subreddits: Vec<String>,
    pub posts_per_subreddit: u32,
}

impl Default for RedditSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: None,
            max_age_minutes: None,
            subreddits: Vec::new(),
            posts_per_subreddit: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HackerNewsSourceConfig {
    pub enabled: bool,
    pub scan_interval_secs: Option<u64>,
    pub max_age_minutes: Option<u64>,
    pub story_limit: u32,
}

impl Default for HackerNewsSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: None,
            max_age_minutes: None,
            story_limit: 50,
        }
    }
}

/// Settings shared by feed-based platforms.
///
/// `terms` are platform search terms (job-search queries for Upwork, tags for
/// Stack Overflow, category paths for Product Hunt) expanded into feed URLs by the adapter; `feeds` are
/// literal feed URLs polled as-is. Unset limits fall back to the platform's
/// own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSourceConfig {
    pub enabled: bool,
    pub scan_interval_secs: Option<u64>,
    pub max_age_minutes: Option<u64>,
    pub terms: Vec<String>,
    pub feeds: Vec<String>,
    pub entries_per_feed: Option<usize>,
}

impl Default for FeedSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: None,
            max_age_minutes: None,
            terms: Vec::new(),
            feeds: Vec::new(),
            entries_per_feed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TwitterSourceConfig {
    pub enabled: bool,
    pub scan_interval_secs: Option<u64>,
    pub queries: Vec<String>,
    pub max_results: u32,
    /// Search calls allowed per calendar month.
    pub monthly_call_budget: u32,
}

impl Default for TwitterSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: None,
            queries: Vec::new(),
            max_results: 25,
            monthly_call_budget: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubSourceConfig {
    pub enabled: bool,
    pub scan_interval_secs: Option<u64>,
    pub max_age_minutes: Option<u64>,
    /// Issue-search phrases; `is:issue is:open` is appended by the adapter.
    pub queries: Vec<String>,
    pub per_page: u32,
}

impl Default for GithubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: None,
            max_age_minutes: None,
            queries: Vec::new(),
            per_page: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesFile {
    pub reddit: RedditSourceConfig,
    pub hackernews: HackerNewsSourceConfig,
    pub upwork: FeedSourceConfig,
    pub stackoverflow: FeedSourceConfig,
    pub twitter: TwitterSourceConfig,
    pub producthunt: FeedSourceConfig,
    pub github: GithubSourceConfig,
}

impl SourcesFile {
    /// Whether the section for `platform` is enabled. Platforms without a
    /// section here (externally registered adapters) are always enabled.
    #[must_use]
    pub fn is_enabled(&self, platform: &str) -> bool {
        match platform {
            "reddit" => self.reddit.enabled,
            "hackernews" => self.hackernews.enabled,
            "upwork" => self.upwork.enabled,
            "stackoverflow" => self.stackoverflow.enabled,
            "twitter" => self.twitter.enabled,
            "producthunt" => self.producthunt.enabled,
            "github" => self.github.enabled,
            _ => true,
        }
    }
}

/// Load and validate the sources configuration from a YAML file.
///
/// A missing file yields the built-in defaults with every platform enabled.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    if !path.exists() {
        return Ok(SourcesFile::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sources(&content)
}

/// Parse and validate sources YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML, unknown keys, or invalid values.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources: SourcesFile = if content.trim().is_empty() {
        SourcesFile::default()
    } else {
        serde_yaml::from_str(content)?
    };
    validate_sources(&sources)?;
    Ok(sources)
}

fn validate_sources(sources: &SourcesFile) -> Result<(), ConfigError> {
    let reddit = &sources.reddit;
    check_positive("reddit", "scan_interval_secs", reddit.scan_interval_secs)?;
    check_max_age("reddit", reddit.max_age_minutes)?;
    if reddit.posts_per_subreddit == 0 || reddit.posts_per_subreddit > 100 {
        return Err(ConfigError::Validation(format!(
            "reddit.posts_per_subreddit must be between 1 and 100, got {}",
            reddit.posts_per_subreddit
        )));
    }
    if let Some(bad) = reddit
        .subreddits
        .iter()
        .find(|s| s.trim().is_empty() || s.contains('/'))
    {
        return Err(ConfigError::Validation(format!(
            "reddit.subreddits entry '{bad}' must be a bare subreddit name"
        )));
    }

    let hn = &sources.hackernews;
    check_positive("hackernews", "scan_interval_secs", hn.scan_interval_secs)?;
    check_max_age("hackernews", hn.max_age_minutes)?;
    if hn.story_limit == 0 {
        return Err(ConfigError::Validation(
            "hackernews.story_limit must be greater than zero".to_string(),
        ));
    }

    validate_feed("upwork", &sources.upwork)?;
    validate_feed("stackoverflow", &sources.stackoverflow)?;
    validate_feed("producthunt", &sources.producthunt)?;

    let twitter = &sources.twitter;
    check_positive("twitter", "scan_interval_secs", twitter.scan_interval_secs)?;
    if !(10..=100).contains(&twitter.max_results) {
        return Err(ConfigError::Validation(format!(
            "twitter.max_results must be between 10 and 100, got {}",
            twitter.max_results
        )));
    }
    if twitter.monthly_call_budget == 0 {
        return Err(ConfigError::Validation(
            "twitter.monthly_call_budget must be greater than zero".to_string(),
        ));
    }
    if twitter.queries.iter().any(|q| q.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "twitter.queries must not contain blank entries".to_string(),
        ));
    }

    let github = &sources.github;
    check_positive("github", "scan_interval_secs", github.scan_interval_secs)?;
    check_max_age("github", github.max_age_minutes)?;
    if !(1..=100).contains(&github.per_page) {
        return Err(ConfigError::Validation(format!(
            "github.per_page must be between 1 and 100, got {}",
            github.per_page
        )));
    }
    if github.queries.iter().any(|q| q.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "github.queries must not contain blank entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_feed(section: &str, feed: &FeedSourceConfig) -> Result<(), ConfigError> {
    check_positive(section, "scan_interval_secs", feed.scan_interval_secs)?;
    check_max_age(section, feed.max_age_minutes)?;
    if feed.entries_per_feed == Some(0) {
        return Err(ConfigError::Validation(format!(
            "{section}.entries_per_feed must be greater than zero"
        )));
    }
    if let Some(bad) = feed
        .feeds
        .iter()
        .find(|url| !(url.starts_with("https://") || url.starts_with("http://")))
    {
        return Err(ConfigError::Validation(format!(
            "{section}.feeds entry '{bad}' must be an http(s) URL"
        )));
    }
    if feed.terms.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{section}.terms must not contain blank entries"
        )));
    }
    Ok(())
}

fn check_max_age(section: &str, value: Option<u64>) -> Result<(), ConfigError> {
    check_positive(section, "max_age_minutes", value)?;
    if let Some(minutes) = value.filter(|m| *m > MAX_AGE_LIMIT_MINUTES) {
        return Err(ConfigError::Validation(format!(
            "{section}.max_age_minutes must be at most {MAX_AGE_LIMIT_MINUTES}, got {minutes}"
        )));
    }
    Ok(())
}

fn check_positive(section: &str, field: &str, value: Option<u64>) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::Validation(format!(
            "{section}.{field} must be greater than zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
