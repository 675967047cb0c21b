use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform-specific extra attached to an item (subreddit, vote count, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Text(String),
    Number(f64),
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Text(value.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Text(value)
    }
}

impl From<i64> for ExtraValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        ExtraValue::Number(value as f64)
    }
}

/// Raw capture of one post, job or question, produced fresh on every poll.
///
/// Never persisted directly: the gate turns it into a [`crate::Signal`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateItem {
    pub platform: String,
    /// Post/job id, unique per platform. `None` when the platform exposes no
    /// stable id; the fingerprint then falls back to a title hash.
    pub source_id: Option<String>,
    pub title: String,
    pub body: String,
    pub author: String,
    pub url: String,
    pub observed_at: DateTime<Utc>,
    pub extras: BTreeMap<String, ExtraValue>,
}

impl IntermediateItem {
    #[must_use]
    pub fn new(platform: &str, source_id: Option<String>, title: &str, url: &str) -> Self {
        Self {
            platform: platform.to_string(),
            source_id,
            title: title.to_string(),
            body: String::new(),
            author: String::new(),
            url: url.to_string(),
            observed_at: Utc::now(),
            extras: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    #[must_use]
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: impl Into<ExtraValue>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }

    /// Title and body joined for keyword scanning. Empty parts are skipped.
    #[must_use]
    pub fn scoring_text(&self) -> String {
        match (self.title.trim(), self.body.trim()) {
            ("", body) => body.to_string(),
            (title, "") => title.to_string(),
            (title, body) => format!("{title} {body}"),
        }
    }
}
