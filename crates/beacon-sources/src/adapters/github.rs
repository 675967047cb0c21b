//! GitHub issue search for open "help wanted"-style issues.
//!
//! Works anonymously; a `GITHUB_TOKEN` only raises the search rate limit.
//! Anonymous search is throttled hard, so a 403 is treated as transient.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{GithubSourceConfig, IntermediateItem};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::adapter::{effective_interval, max_age_window, truncate_chars, PlatformAdapter};
use crate::error::FetchError;
use crate::http;

pub const PLATFORM: &str = "github";
const COLOR: &str = "#24292E";
const MIN_INTERVAL_SECS: u64 = 600;
const DEFAULT_MAX_AGE_MINUTES: u64 = 1440;
const BODY_LIMIT: usize = 500;
const API_BASE: &str = "https://api.github.com";

const DEFAULT_QUERIES: &[&str] = &[
    "help wanted",
    "urgent bug",
    "critical bug",
    "production bug",
    "need help",
    "bounty",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    id: u64,
    title: String,
    body: Option<String>,
    html_url: String,
    user: Option<IssueUser>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    comments: i64,
    repository_url: Option<String>,
    /// Present when the hit is a pull request rather than an issue.
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueUser {
    login: String,
}

pub struct GithubAdapter {
    client: Client,
    token: Option<String>,
    queries: Vec<String>,
    per_page: u32,
    max_age: chrono::Duration,
    interval: Duration,
    api_base: String,
}

impl GithubAdapter {
    #[must_use]
    pub fn new(client: Client, config: &GithubSourceConfig, token: Option<String>) -> Self {
        let queries = if config.queries.is_empty() {
            DEFAULT_QUERIES.iter().map(ToString::to_string).collect()
        } else {
            config.queries.clone()
        };
        let max_age_minutes = config.max_age_minutes.unwrap_or(DEFAULT_MAX_AGE_MINUTES);
        Self {
            client,
            token,
            queries,
            per_page: config.per_page,
            max_age: max_age_window(max_age_minutes),
            interval: effective_interval(MIN_INTERVAL_SECS, config.scan_interval_secs),
            api_base: API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<Issue>, FetchError> {
        let q = search_query(query);
        let per_page = self.per_page.to_string();
        let mut request = self
            .client
            .get(format!("{}/search/issues", self.api_base))
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", q.as_str()),
                ("sort", "created"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response: SearchResponse =
            http::send_json(request, self.token.is_some(), "github issue search").await?;
        Ok(response.items)
    }

    fn to_item(&self, issue: Issue, now: DateTime<Utc>) -> Option<IntermediateItem> {
        if issue.pull_request.is_some() {
            return None;
        }
        if let Some(created) = issue.created_at {
            if now - created > self.max_age {
                return None;
            }
        }

        let body = issue
            .body
            .as_deref()
            .map(|b| truncate_chars(b.trim(), BODY_LIMIT))
            .unwrap_or_default();
        let author = issue.user.map(|u| u.login).unwrap_or_default();

        let mut item = IntermediateItem::new(
            PLATFORM,
            Some(issue.id.to_string()),
            issue.title.trim(),
            &issue.html_url,
        )
        .with_body(&body)
        .with_author(&author)
        .with_extra("comments", issue.comments);
        if let Some(repository) = issue.repository_url.as_deref().and_then(repository_name) {
            item = item.with_extra("repository", repository);
        }
        if let Some(created) = issue.created_at {
            item = item.with_observed_at(created);
        }
        Some(item)
    }
}

fn search_query(phrase: &str) -> String {
    format!("{} is:issue is:open", phrase.trim())
}

/// `https://api.github.com/repos/owner/name` -> `owner/name`.
fn repository_name(repository_url: &str) -> Option<&str> {
    repository_url
        .split_once("/repos/")
        .map(|(_, name)| name.trim_end_matches('/'))
        .filter(|name| name.contains('/'))
}

#[async_trait]
impl PlatformAdapter for GithubAdapter {
    fn platform_name(&self) -> &str {
        PLATFORM
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn scan_interval(&self) -> Duration {
        self.interval
    }

    fn display_color(&self) -> &str {
        COLOR
    }

    /// Runs every query once. The same issue can match several phrases and
    /// is reported once per scan.
    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError> {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for query in &self.queries {
            for issue in self.search(query).await? {
                if !seen.insert(issue.id) {
                    continue;
                }
                if let Some(item) = self.to_item(issue, now) {
                    items.push(item);
                }
            }
        }

        tracing::debug!(
            platform = PLATFORM,
            queries = self.queries.len(),
            items = items.len(),
            "github: scan complete"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_are_limited_to_open_issues() {
        assert_eq!(search_query(" help wanted "), "help wanted is:issue is:open");
    }

    #[test]
    fn repository_name_comes_from_api_url() {
        assert_eq!(
            repository_name("https://api.github.com/repos/rust-lang/cargo"),
            Some("rust-lang/cargo")
        );
        assert_eq!(repository_name("https://api.github.com/users/octocat"), None);
    }

    #[test]
    fn configured_queries_replace_defaults() {
        let config = GithubSourceConfig {
            queries: vec!["bounty".to_string()],
            ..GithubSourceConfig::default()
        };
        let adapter = GithubAdapter::new(Client::new(), &config, None);
        assert_eq!(adapter.queries, vec!["bounty".to_string()]);
        assert!(!adapter.requires_auth());
    }
}
