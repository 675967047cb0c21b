//! Reddit `new` listings via the OAuth API (client-credentials grant).

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{IntermediateItem, RedditCredentials, RedditSourceConfig};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::adapter::{effective_interval, max_age_window, truncate_chars, PlatformAdapter};
use crate::error::FetchError;
use crate::http;
use crate::relevance::looks_like_request;

pub const PLATFORM: &str = "reddit";
const COLOR: &str = "#FF4500";
const MIN_INTERVAL_SECS: u64 = 300;
const DEFAULT_MAX_AGE_MINUTES: u64 = 60;
const BODY_LIMIT: usize = 500;
const DEFAULT_SUBREDDITS: [&str; 4] = ["webdev", "programming", "forhire", "freelance"];

const AUTH_BASE: &str = "https://www.reddit.com";
const API_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: Option<String>,
    selftext: Option<String>,
    author: Option<String>,
    permalink: Option<String>,
    subreddit: Option<String>,
    created_utc: f64,
}

pub struct RedditAdapter {
    client: Client,
    credentials: Option<RedditCredentials>,
    subreddits: Vec<String>,
    posts_per_subreddit: u32,
    max_age: chrono::Duration,
    interval: Duration,
    auth_base: String,
    api_base: String,
    token: Mutex<Option<String>>,
}

impl RedditAdapter {
    #[must_use]
    pub fn new(
        client: Client,
        config: &RedditSourceConfig,
        credentials: Option<RedditCredentials>,
    ) -> Self {
        let subreddits = if config.subreddits.is_empty() {
            DEFAULT_SUBREDDITS.iter().map(ToString::to_string).collect()
        } else {
            config.subreddits.clone()
        };
        let max_age_minutes = config.max_age_minutes.unwrap_or(DEFAULT_MAX_AGE_MINUTES);
        Self {
            client,
            credentials,
            subreddits,
            posts_per_subreddit: config.posts_per_subreddit,
            max_age: max_age_window(max_age_minutes),
            interval: effective_interval(MIN_INTERVAL_SECS, config.scan_interval_secs),
            auth_base: AUTH_BASE.to_string(),
            api_base: API_BASE.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point both the token endpoint and the listing API at `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        self.auth_base.clone_from(&base);
        self.api_base = base;
        self
    }

    async fn access_token(&self, creds: &RedditCredentials) -> Result<String, FetchError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let request = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_base))
            .header("User-Agent", &creds.user_agent)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let response: TokenResponse = http::send_json(request, true, "reddit token").await?;

        *cached = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    async fn fetch_subreddit(
        &self,
        creds: &RedditCredentials,
        token: &str,
        subreddit: &str,
    ) -> Result<Vec<PostData>, FetchError> {
        let url = format!("{}/r/{subreddit}/new", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", &creds.user_agent)
            .query(&[("limit", self.posts_per_subreddit.to_string())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Tokens expire after an hour; fetch a fresh one next scan.
            *self.token.lock().await = None;
            return Err(FetchError::Transient(
                "reddit access token expired".to_string(),
            ));
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            tracing::warn!(
                platform = PLATFORM,
                subreddit,
                %status,
                "reddit: subreddit unavailable, skipping"
            );
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FetchError::from_status(status, &url, true));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| FetchError::decode("reddit listing", e))?;
        Ok(listing.data.children.into_iter().map(|p| p.data).collect())
    }

    fn to_item(&self, post: PostData, now: DateTime<Utc>) -> Option<IntermediateItem> {
        let title = post.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let permalink = post.permalink.as_deref()?;

        #[allow(clippy::cast_possible_truncation)]
        let created = DateTime::from_timestamp(post.created_utc as i64, 0)?;
        if now - created > self.max_age {
            return None;
        }

        let body = match post.selftext.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() && text != "[deleted]" && text != "[removed]" => {
                truncate_chars(text, BODY_LIMIT)
            }
            _ => String::new(),
        };
        if !looks_like_request(&format!("{title} {body}")) {
            return None;
        }

        let mut item = IntermediateItem::new(
            PLATFORM,
            Some(post.id),
            title,
            &format!("https://reddit.com{permalink}"),
        )
        .with_body(&body)
        .with_author(post.author.as_deref().unwrap_or_default())
        .with_observed_at(created);
        if let Some(subreddit) = post.subreddit {
            item = item.with_extra("subreddit", subreddit);
        }
        Some(item)
    }
}

#[async_trait]
impl PlatformAdapter for RedditAdapter {
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
        let Some(creds) = self.credentials.as_ref() else {
            return Err(FetchError::Configuration(
                "REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET are not set".to_string(),
            ));
        };

        let token = self.access_token(creds).await?;
        let now = Utc::now();
        let mut items = Vec::new();

        for subreddit in &self.subreddits {
            let posts = self.fetch_subreddit(creds, &token, subreddit).await?;
            items.extend(posts.into_iter().filter_map(|p| self.to_item(p, now)));
        }

        tracing::debug!(
            platform = PLATFORM,
            subreddits = self.subreddits.len(),
            items = items.len(),
            "reddit: scan complete"
        );
        Ok(items)
    }
}
