//! `netverse-lib` keeps outbound traffic to rate-limited services in check.
//!
//! The heart of the crate is the [`Governor`], an admission controller that
//! guarantees an operation is not started more than `max_requests` times per
//! rolling window for a given key. Calls that cannot be admitted are retried
//! with capped exponential backoff and, once the retries are spent, parked in
//! a bounded per-key FIFO that is drained at the nominal request spacing.
//!
//! Two callers are built on top of it: a [`SearchClient`] which fans a query
//! out to the web, image, video and news endpoints of the Brave search API,
//! and a breadth-first [`Crawler`].
//!
//! ```no_run
//! use netverse_lib::{Governor, GovernorConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let governor = Governor::new(GovernorConfig::default())?;
//!     let answer = governor.execute("answers", || async { Ok(42) }).await?;
//!     assert_eq!(answer, 42);
//!     Ok(())
//! }
//! ```
//!
//! Searching all four endpoints at once:
//!
//! ```no_run
//! use netverse_lib::{Result, SearchClientBuilder, SearchKind};
//! use strum::IntoEnumIterator;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = SearchClientBuilder::builder()
//!         .api_key(secrecy::SecretString::from("token"))
//!         .build()
//!         .client()?;
//!     let kinds: Vec<_> = SearchKind::iter().collect();
//!     let results = client.search("rust governor", &kinds).await?;
//!     println!("{} hits", results.total_hits());
//!     Ok(())
//! }
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature

mod retry;
mod types;
mod utils;

pub mod crawler;
pub mod extract;
pub mod ratelimit;
pub mod search;

pub use crate::{
    crawler::{CrawlResult, Crawler, CrawlerBuilder},
    ratelimit::{Governor, GovernorConfig, GovernorKey, KeyConfig, KeyConfigs},
    retry::RateLimitExt,
    search::{SearchClient, SearchClientBuilder, SearchHit, SearchKind, SearchResults},
    types::{ErrorKind, Result},
};

/// Default timeout in seconds before an outbound request is deemed as failed, 20.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Default user agent for search requests, `netverse-<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("netverse/", env!("CARGO_PKG_VERSION"));
