//! Generic adapter over a list of RSS/Atom feeds.
//!
//! Feed platforms differ only in how search terms become URLs and in a few
//! limits, so each one is a [`FeedProfile`] plugged into [`FeedAdapter`].

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{FeedSourceConfig, IntermediateItem};
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::adapter::{effective_interval, max_age_window, truncate_chars, PlatformAdapter};
use crate::error::FetchError;
use crate::http;
use crate::relevance::looks_like_request;
use crate::rss_helpers::{parse_feed, FeedEntry};

/// Static per-platform settings for a [`FeedAdapter`].
#[derive(Debug, Clone, Copy)]
pub struct FeedProfile {
    pub platform: &'static str,
    pub color: &'static str,
    pub min_interval_secs: u64,
    pub default_max_age_minutes: u64,
    /// Entries read per feed unless the config says otherwise.
    pub default_entries_per_feed: usize,
    pub body_limit: usize,
    pub default_terms: &'static [&'static str],
    /// Turns a base URL and a search term into a feed URL.
    pub feed_url: fn(&str, &str) -> String,
    pub base_url: &'static str,
    /// Drop entries that do not read like a request for help.
    pub require_request_language: bool,
}

pub struct FeedAdapter {
    profile: FeedProfile,
    client: Client,
    terms: Vec<String>,
    extra_feeds: Vec<String>,
    entries_per_feed: usize,
    max_age: chrono::Duration,
    interval: Duration,
    base_url: String,
}

impl FeedAdapter {
    #[must_use]
    pub fn new(profile: FeedProfile, client: Client, config: &FeedSourceConfig) -> Self {
        let terms = if config.terms.is_empty() && config.feeds.is_empty() {
            profile
                .default_terms
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            config.terms.clone()
        };
        let entries_per_feed = config
            .entries_per_feed
            .unwrap_or(profile.default_entries_per_feed);
        let max_age_minutes = config
            .max_age_minutes
            .unwrap_or(profile.default_max_age_minutes);

        Self {
            profile,
            client,
            terms,
            extra_feeds: config.feeds.clone(),
            entries_per_feed,
            max_age: max_age_window(max_age_minutes),
            interval: effective_interval(profile.min_interval_secs, config.scan_interval_secs),
            base_url: profile.base_url.to_string(),
        }
    }

    /// Build term feeds against `base_url` instead of the public site.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Every URL polled by one scan, term feeds first.
    #[must_use]
    pub fn feed_urls(&self) -> Vec<String> {
        self.terms
            .iter()
            .map(|term| (self.profile.feed_url)(&self.base_url, term))
            .chain(self.extra_feeds.iter().cloned())
            .collect()
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>, FetchError> {
        let xml = http::send_text(self.client.get(url), false).await?;
        parse_feed(&xml, self.entries_per_feed)
    }

    fn to_item(&self, entry: FeedEntry, now: DateTime<Utc>) -> Option<IntermediateItem> {
        if let Some(published) = entry.published {
            if now - published > self.max_age {
                return None;
            }
        }
        let body = truncate_chars(&entry.summary, self.profile.body_limit);
        if self.profile.require_request_language
            && !looks_like_request(&format!("{} {body}", entry.title))
        {
            return None;
        }

        let mut item = IntermediateItem::new(
            self.profile.platform,
            Some(entry.key().to_string()),
            &entry.title,
            &entry.link,
        )
        .with_body(&body)
        .with_author(&entry.author);
        if let Some(published) = entry.published {
            item = item.with_observed_at(published);
        }
        Some(item)
    }
}

#[async_trait]
impl PlatformAdapter for FeedAdapter {
    fn platform_name(&self) -> &str {
        self.profile.platform
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn scan_interval(&self) -> Duration {
        self.interval
    }

    fn display_color(&self) -> &str {
        self.profile.color
    }

    /// Polls every feed once. Individual feed failures are logged and
    /// skipped; the scan fails only when every feed failed.
    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError> {
        let urls = self.feed_urls();
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut first_error = None;
        let mut failures = 0usize;

        for url in &urls {
            match self.fetch_feed(url).await {
                Ok(entries) => {
                    for entry in entries {
                        if !seen.insert(entry.key().to_string()) {
                            continue;
                        }
                        if let Some(item) = self.to_item(entry, now) {
                            items.push(item);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        platform = self.profile.platform,
                        feed = url.as_str(),
                        error = %e,
                        "feed: fetch failed"
                    );
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if failures == urls.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        tracing::debug!(
            platform = self.profile.platform,
            feeds = urls.len(),
            failures,
            items = items.len(),
            "feed: scan complete"
        );
        Ok(items)
    }
}
