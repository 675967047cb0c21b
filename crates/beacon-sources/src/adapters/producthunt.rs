//! Product Hunt launch feeds.

use beacon_core::FeedSourceConfig;
use reqwest::Client;

use super::feed::{FeedAdapter, FeedProfile};

pub const PLATFORM: &str = "producthunt";

const DEFAULT_CATEGORIES: &[&str] = &[
    "feed",
    "feed/tech",
    "feed/developer-tools",
    "feed/web-app",
];

fn category_feed_url(base: &str, path: &str) -> String {
    format!("{base}/{}", path.trim_matches('/'))
}

/// Launches move slowly; a half-hour poll and a six-hour window are enough.
pub const PROFILE: FeedProfile = FeedProfile {
    platform: PLATFORM,
    color: "#DA552F",
    min_interval_secs: 1800,
    default_max_age_minutes: 360,
    default_entries_per_feed: 10,
    body_limit: 400,
    default_terms: DEFAULT_CATEGORIES,
    feed_url: category_feed_url,
    base_url: "https://www.producthunt.com",
    require_request_language: false,
};

#[must_use]
pub fn adapter(client: Client, config: &FeedSourceConfig) -> FeedAdapter {
    FeedAdapter::new(PROFILE, client, config)
}
