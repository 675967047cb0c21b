//! Stack Overflow per-tag Atom feeds.

use beacon_core::FeedSourceConfig;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;

use super::feed::{FeedAdapter, FeedProfile};

pub const PLATFORM: &str = "stackoverflow";

/// Tag names keep their dots and dashes (`node.js`, `ruby-on-rails`).
const TAG: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-');

const DEFAULT_TAGS: &[&str] = &[
    "help",
    "urgent",
    "javascript",
    "reactjs",
    "python",
    "node.js",
    "debugging",
    "error",
];

fn tag_feed_url(base: &str, tag: &str) -> String {
    let encoded = utf8_percent_encode(tag, TAG);
    format!("{base}/feeds/tag/{encoded}")
}

pub const PROFILE: FeedProfile = FeedProfile {
    platform: PLATFORM,
    color: "#F58025",
    min_interval_secs: 600,
    default_max_age_minutes: 120,
    default_entries_per_feed: 5,
    body_limit: 400,
    default_terms: DEFAULT_TAGS,
    feed_url: tag_feed_url,
    base_url: "https://stackoverflow.com",
    require_request_language: true,
};

#[must_use]
pub fn adapter(client: Client, config: &FeedSourceConfig) -> FeedAdapter {
    FeedAdapter::new(PROFILE, client, config)
}
