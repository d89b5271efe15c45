//! Search aggregation over the Brave search API.
//!
//! A query is fanned out to one endpoint per [`SearchKind`]. Every endpoint
//! has its own [`GovernorKey`](crate::GovernorKey), so a throttled image
//! search never holds back web results.

mod cache;
mod client;
mod kind;
mod types;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, DEFAULT_RESULT_COUNT, DEFAULT_RETRY_WAIT_TIME,
    SearchClient, SearchClientBuilder,
};
pub use kind::SearchKind;
pub use types::{SearchHit, SearchResults, SearchSection, favicon_url};
