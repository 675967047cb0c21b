//! Twitter/X recent search (API v2) with a monthly call budget.
//!
//! The free API tier allows roughly a hundred search calls a month, so the
//! adapter counts its own calls and refuses to spend past the budget. An
//! exhausted budget is reported as transient: the month rolls over.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{IntermediateItem, TwitterSourceConfig};
use chrono::{DateTime, Datelike, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::adapter::{effective_interval, truncate_chars, PlatformAdapter};
use crate::error::FetchError;
use crate::http;

pub const PLATFORM: &str = "twitter";
const COLOR: &str = "#1DA1F2";
const MIN_INTERVAL_SECS: u64 = 21_600;
const TITLE_LIMIT: usize = 100;
const API_BASE: &str = "https://api.twitter.com/2";

const DEFAULT_QUERIES: &[&str] = &[
    "\"need developer\" urgent -is:retweet",
    "\"hire developer\" budget -is:retweet",
    "\"help with\" javascript react urgent -is:retweet",
    "\"website broken\" help -is:retweet",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Calls spent in the current calendar month (UTC).
#[derive(Debug)]
pub struct CallBudget {
    limit: u32,
    spent: Mutex<(i32, u32, u32)>,
}

impl CallBudget {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            spent: Mutex::new((0, 0, 0)),
        }
    }

    /// Reserve one call at `now`. Returns `false` once the month's budget is used.
    pub fn try_spend(&self, now: DateTime<Utc>) -> bool {
        let mut guard = self
            .spent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (year, month, used) = &mut *guard;
        if (*year, *month) != (now.year(), now.month()) {
            *year = now.year();
            *month = now.month();
            *used = 0;
        }
        if *used >= self.limit {
            return false;
        }
        *used += 1;
        true
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        let guard = self
            .spent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if (guard.0, guard.1) == (now.year(), now.month()) {
            self.limit.saturating_sub(guard.2)
        } else {
            self.limit
        }
    }
}

pub struct TwitterAdapter {
    client: Client,
    bearer_token: Option<String>,
    queries: Vec<String>,
    max_results: u32,
    budget: CallBudget,
    interval: Duration,
    api_base: String,
}

impl TwitterAdapter {
    #[must_use]
    pub fn new(client: Client, config: &TwitterSourceConfig, bearer_token: Option<String>) -> Self {
        let queries = if config.queries.is_empty() {
            DEFAULT_QUERIES.iter().map(ToString::to_string).collect()
        } else {
            config.queries.clone()
        };
        Self {
            client,
            bearer_token,
            queries,
            max_results: config.max_results,
            budget: CallBudget::new(config.monthly_call_budget),
            interval: effective_interval(MIN_INTERVAL_SECS, config.scan_interval_secs),
            api_base: API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, token: &str, query: &str) -> Result<Vec<IntermediateItem>, FetchError> {
        let max_results = self.max_results.to_string();
        let request = self
            .client
            .get(format!("{}/tweets/search/recent", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,author_id,public_metrics"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ]);
        let response: SearchResponse = http::send_json(request, true, "twitter search").await?;

        let usernames: HashMap<String, String> = response
            .includes
            .map(|i| i.users.into_iter().map(|u| (u.id, u.username)).collect())
            .unwrap_or_default();

        Ok(response
            .data
            .into_iter()
            .map(|tweet| to_item(tweet, &usernames))
            .collect())
    }
}

fn to_item(tweet: Tweet, usernames: &HashMap<String, String>) -> IntermediateItem {
    let username = tweet
        .author_id
        .as_ref()
        .and_then(|id| usernames.get(id))
        .cloned()
        .unwrap_or_default();
    let url = if username.is_empty() {
        format!("https://x.com/i/status/{}", tweet.id)
    } else {
        format!("https://x.com/{username}/status/{}", tweet.id)
    };
    let title = truncate_chars(&tweet.text, TITLE_LIMIT);
    let metrics = tweet.public_metrics.unwrap_or(PublicMetrics {
        like_count: 0,
        retweet_count: 0,
    });

    let mut item = IntermediateItem::new(PLATFORM, Some(tweet.id), &title, &url)
        .with_body(&tweet.text)
        .with_author(&username)
        .with_extra("like_count", metrics.like_count)
        .with_extra("retweet_count", metrics.retweet_count);
    if let Some(created_at) = tweet.created_at {
        item = item.with_observed_at(created_at);
    }
    item
}

#[async_trait]
impl PlatformAdapter for TwitterAdapter {
    fn platform_name(&self) -> &str {
        PLATFORM
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn scan_interval(&self) -> Duration {
        self.interval
    }

    fn display_color(&self) -> &str {
        COLOR
    }

    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError> {
        let Some(token) = self.bearer_token.as_deref() else {
            return Err(FetchError::Configuration(
                "TWITTER_BEARER_TOKEN is not set".to_string(),
            ));
        };

        let mut items = Vec::new();
        let mut calls = 0usize;
        for query in &self.queries {
            if !self.budget.try_spend(Utc::now()) {
                break;
            }
            calls += 1;
            items.extend(self.search(token, query).await?);
        }

        if calls == 0 {
            return Err(FetchError::Transient(
                "twitter monthly call budget exhausted".to_string(),
            ));
        }

        tracing::debug!(
            platform = PLATFORM,
            calls,
            remaining = self.budget.remaining(Utc::now()),
            items = items.len(),
            "twitter: scan complete"
        );
        Ok(items)
    }
}
