//! Upwork job-search RSS feeds.

use beacon_core::FeedSourceConfig;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client;

use super::feed::{FeedAdapter, FeedProfile};

pub const PLATFORM: &str = "upwork";

const DEFAULT_SEARCHES: &[&str] = &[
    "web developer needed",
    "fix website",
    "urgent developer",
    "help bug",
    "react developer",
    "javascript",
    "node js",
    "programmer needed",
];

fn search_feed_url(base: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
    format!("{base}/ab/feed/jobs/rss?q={encoded}&sort=recency")
}

pub const PROFILE: FeedProfile = FeedProfile {
    platform: PLATFORM,
    color: "#14A800",
    min_interval_secs: 600,
    default_max_age_minutes: 120,
    default_entries_per_feed: 10,
    body_limit: 500,
    default_terms: DEFAULT_SEARCHES,
    feed_url: search_feed_url,
    base_url: "https://www.upwork.com",
    require_request_language: false,
};

#[must_use]
pub fn adapter(client: Client, config: &FeedSourceConfig) -> FeedAdapter {
    FeedAdapter::new(PROFILE, client, config)
}
