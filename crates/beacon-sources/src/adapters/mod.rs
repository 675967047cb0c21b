//! Built-in platform adapters.
//!
//! Adding a platform means adding a module here and one `register` call in
//! [`register_builtin`]; the orchestrator never names concrete adapters.

pub mod feed;
pub mod github;
pub mod hackernews;
pub mod producthunt;
pub mod reddit;
pub mod stackoverflow;
pub mod twitter;
pub mod upwork;

use std::sync::Arc;

use crate::adapter::PlatformAdapter;
use crate::registry::Registry;

pub use feed::{FeedAdapter, FeedProfile};
pub use github::GithubAdapter;
pub use hackernews::HackerNewsAdapter;
pub use reddit::RedditAdapter;
pub use twitter::{CallBudget, TwitterAdapter};

fn shared<A: PlatformAdapter + 'static>(adapter: A) -> Arc<dyn PlatformAdapter> {
    Arc::new(adapter)
}

pub(crate) fn register_builtin(registry: &mut Registry) {
    registry.register(reddit::PLATFORM, |ctx| {
        shared(RedditAdapter::new(
            ctx.client.clone(),
            &ctx.sources.reddit,
            ctx.credentials.reddit.clone(),
        ))
    });
    registry.register(hackernews::PLATFORM, |ctx| {
        shared(HackerNewsAdapter::new(
            ctx.client.clone(),
            &ctx.sources.hackernews,
        ))
    });
    registry.register(upwork::PLATFORM, |ctx| {
        shared(upwork::adapter(ctx.client.clone(), &ctx.sources.upwork))
    });
    registry.register(stackoverflow::PLATFORM, |ctx| {
        shared(stackoverflow::adapter(
            ctx.client.clone(),
            &ctx.sources.stackoverflow,
        ))
    });
    registry.register(twitter::PLATFORM, |ctx| {
        shared(TwitterAdapter::new(
            ctx.client.clone(),
            &ctx.sources.twitter,
            ctx.credentials.twitter_bearer_token.clone(),
        ))
    });
    registry.register(producthunt::PLATFORM, |ctx| {
        shared(producthunt::adapter(
            ctx.client.clone(),
            &ctx.sources.producthunt,
        ))
    });
    registry.register(github::PLATFORM, |ctx| {
        shared(GithubAdapter::new(
            ctx.client.clone(),
            &ctx.sources.github,
            ctx.credentials.github_token.clone(),
        ))
    });
}
