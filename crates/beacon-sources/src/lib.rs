//! Platform adapters and the registry that discovers them.
//!
//! Every platform implements [`PlatformAdapter`]; [`Registry::builtin`]
//! knows the shipped platforms (Reddit, Hacker News, Upwork, Stack Overflow,
//! Twitter, Product Hunt and GitHub) and [`Registry::register`] accepts more.

pub mod adapter;
pub mod adapters;
pub mod error;
pub mod http;
pub mod registry;
pub mod relevance;
pub(crate) mod rss_helpers;

pub use adapter::{effective_interval, max_age_window, PlatformAdapter, DEFAULT_DISPLAY_COLOR};
pub use error::FetchError;
pub use http::build_client;
pub use registry::{AdapterContext, Discovery, Exclusion, ExclusionReason, Registry};
