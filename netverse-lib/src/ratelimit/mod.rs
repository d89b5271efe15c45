//! Per-key admission control for outbound calls.
//!
//! Every call runs through [`Governor::execute`] together with a
//! [`GovernorKey`] naming the resource it hits. For each key the governor
//! keeps a rolling log of admission timestamps, so that no more than
//! `max_requests` operations start within any `window`.
//!
//! # Architecture
//!
//! - [`GovernorKey`]: Opaque name of an independently throttled resource
//! - [`RequestLog`]: Rolling window of admission timestamps for one key
//! - [`Governor`]: Owns the per-key state and runs the retry and queue logic
//! - [`GovernorConfig`]: Process-wide limits, with [`KeyConfig`] overrides
//! - [`KeyStats`]: Statistics tracking for each key

mod config;
mod error;
mod governor;
pub(crate) mod headers;
mod key;
mod queue;
mod stats;
mod window;

pub use config::{GovernorConfig, KeyConfig, KeyConfigs, KeyLimits};
pub use error::RateLimitError;
pub use governor::Governor;
pub use key::GovernorKey;
pub use stats::{KeyStats, KeyStatsMap};
pub use window::{Admission, RequestLog};
