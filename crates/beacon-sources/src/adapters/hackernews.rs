//! Hacker News "Ask HN" stories via the public Firebase API.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{HackerNewsSourceConfig, IntermediateItem};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;

use crate::adapter::{effective_interval, max_age_window, truncate_chars, PlatformAdapter};
use crate::error::FetchError;
use crate::http;
use crate::rss_helpers::strip_html;

pub const PLATFORM: &str = "hackernews";
const COLOR: &str = "#FF6600";
const MIN_INTERVAL_SECS: u64 = 900;
const DEFAULT_MAX_AGE_MINUTES: u64 = 240;
const BODY_LIMIT: usize = 500;
const ITEM_CONCURRENCY: usize = 8;
const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Deserialize)]
struct Story {
    id: u64,
    title: Option<String>,
    text: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    score: Option<i64>,
    #[serde(default)]
    dead: bool,
    #[serde(default)]
    deleted: bool,
}

pub struct HackerNewsAdapter {
    client: Client,
    story_limit: usize,
    max_age: chrono::Duration,
    interval: Duration,
    api_base: String,
}

impl HackerNewsAdapter {
    #[must_use]
    pub fn new(client: Client, config: &HackerNewsSourceConfig) -> Self {
        let max_age_minutes = config.max_age_minutes.unwrap_or(DEFAULT_MAX_AGE_MINUTES);
        Self {
            client,
            story_limit: config.story_limit as usize,
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

    async fn fetch_story(&self, id: u64) -> Option<Story> {
        let request = self.client.get(format!("{}/item/{id}.json", self.api_base));
        match http::send_json::<Option<Story>>(request, false, "hackernews item").await {
            Ok(story) => story,
            Err(e) => {
                tracing::debug!(platform = PLATFORM, id, error = %e, "hackernews: item fetch failed");
                None
            }
        }
    }

    fn to_item(&self, story: Story, now: DateTime<Utc>) -> Option<IntermediateItem> {
        if story.dead || story.deleted {
            return None;
        }
        let title = story.title.as_deref().map(str::trim)?;
        if !is_ask_hn(title) {
            return None;
        }
        let created = DateTime::from_timestamp(story.time?, 0)?;
        if now - created > self.max_age {
            return None;
        }

        let body = story
            .text
            .as_deref()
            .map(|t| truncate_chars(&strip_html(t), BODY_LIMIT))
            .unwrap_or_default();

        Some(
            IntermediateItem::new(
                PLATFORM,
                Some(story.id.to_string()),
                title,
                &format!("https://news.ycombinator.com/item?id={}", story.id),
            )
            .with_body(&body)
            .with_author(story.by.as_deref().unwrap_or_default())
            .with_observed_at(created)
            .with_extra("points", story.score.unwrap_or(0)),
        )
    }
}

fn is_ask_hn(title: &str) -> bool {
    title
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ask hn"))
}

#[async_trait]
impl PlatformAdapter for HackerNewsAdapter {
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

    async fn scan(&self) -> Result<Vec<IntermediateItem>, FetchError> {
        let request = self
            .client
            .get(format!("{}/newstories.json", self.api_base));
        let ids: Vec<u64> = http::send_json(request, false, "hackernews story ids").await?;

        let stories: Vec<Story> = stream::iter(ids.into_iter().take(self.story_limit))
            .map(|id| self.fetch_story(id))
            .buffered(ITEM_CONCURRENCY)
            .filter_map(|story| async move { story })
            .collect()
            .await;

        let now = Utc::now();
        let items: Vec<IntermediateItem> = stories
            .into_iter()
            .filter_map(|s| self.to_item(s, now))
            .collect();

        tracing::debug!(
            platform = PLATFORM,
            items = items.len(),
            "hackernews: scan complete"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::is_ask_hn;

    #[test]
    fn ask_hn_prefix_is_case_insensitive() {
        assert!(is_ask_hn("Ask HN: Who can fix my Rails app?"));
        assert!(is_ask_hn("ASK HN: anyone?"));
        assert!(!is_ask_hn("Show HN: my project"));
        assert!(!is_ask_hn("Ask"));
    }
}
