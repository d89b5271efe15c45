use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ratelimit::{GovernorKey, RateLimitError};

/// Default number of admitted requests per key and window
const DEFAULT_MAX_REQUESTS: usize = 3;

/// Default length of the rolling admission window
const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Default base delay of the exponential backoff
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Default number of inline retries before an operation is queued
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default capacity of the per-key overflow queue
const DEFAULT_QUEUE_SIZE: usize = 100;

/// Global rate limiting configuration that applies as defaults to all keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Maximum number of operations admitted per key within `window`
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Length of the rolling admission window
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    /// Base delay for the exponential backoff and lower bound of the queue
    /// drain spacing
    #[serde(default = "default_retry_after", with = "humantime_serde")]
    pub retry_after: Duration,

    /// Number of inline retries before an operation is moved to the queue
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of operations waiting in a key's overflow queue
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window: default_window(),
            retry_after: default_retry_after(),
            max_retries: default_max_retries(),
            queue_size: default_queue_size(),
        }
    }
}

const fn default_max_requests() -> usize {
    DEFAULT_MAX_REQUESTS
}

const fn default_window() -> Duration {
    DEFAULT_WINDOW
}

const fn default_retry_after() -> Duration {
    DEFAULT_RETRY_AFTER
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}

impl GovernorConfig {
    /// Create a `GovernorConfig` from CLI options, using defaults for missing values
    #[must_use]
    pub fn from_options(
        max_requests: Option<usize>,
        window: Option<Duration>,
        retry_after: Option<Duration>,
        max_retries: Option<u32>,
        queue_size: Option<usize>,
    ) -> Self {
        Self {
            max_requests: max_requests.unwrap_or(DEFAULT_MAX_REQUESTS),
            window: window.unwrap_or(DEFAULT_WINDOW),
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            queue_size: queue_size.unwrap_or(DEFAULT_QUEUE_SIZE),
        }
    }

    /// Check that the limits can be enforced at all.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidConfig`] if `max_requests` is zero or
    /// `window` is empty.
    pub fn validate(&self) -> Result<(), RateLimitError> {
        self.limits().validate()
    }

    /// The limits of a key without any overrides
    #[must_use]
    pub const fn limits(&self) -> KeyLimits {
        KeyLimits {
            max_requests: self.max_requests,
            window: self.window,
            retry_after: self.retry_after,
            max_retries: self.max_retries,
            queue_size: self.queue_size,
        }
    }
}

/// Per-key configuration overrides
pub type KeyConfigs = HashMap<GovernorKey, KeyConfig>;

/// Overrides for a single key. Missing values fall back to the
/// [`GovernorConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    /// Maximum number of operations admitted within the window
    pub max_requests: Option<usize>,

    /// Length of the rolling admission window
    #[serde(default, with = "humantime_serde")]
    pub window: Option<Duration>,

    /// Capacity of the overflow queue
    pub queue_size: Option<usize>,
}

impl KeyConfig {
    /// Merge the overrides into the global limits
    #[must_use]
    pub fn limits(&self, global: &GovernorConfig) -> KeyLimits {
        KeyLimits {
            max_requests: self.max_requests.unwrap_or(global.max_requests),
            window: self.window.unwrap_or(global.window),
            queue_size: self.queue_size.unwrap_or(global.queue_size),
            ..global.limits()
        }
    }
}

/// The effective limits of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLimits {
    /// Maximum number of operations admitted within `window`
    pub max_requests: usize,
    /// Length of the rolling admission window
    pub window: Duration,
    /// Base delay of the backoff
    pub retry_after: Duration,
    /// Inline retries before queuing
    pub max_retries: u32,
    /// Capacity of the overflow queue
    pub queue_size: usize,
}

impl KeyLimits {
    pub(crate) fn validate(&self) -> Result<(), RateLimitError> {
        if self.max_requests == 0 {
            return Err(RateLimitError::InvalidConfig {
                reason: "max_requests must be at least 1".into(),
            });
        }
        if self.window.is_zero() {
            return Err(RateLimitError::InvalidConfig {
                reason: "window must be longer than zero".into(),
            });
        }
        Ok(())
    }

    /// Delay before retry number `attempt + 1`: `retry_after * 2^attempt`,
    /// capped at `window`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.retry_after.checked_mul(factor))
            .unwrap_or(Duration::MAX)
            .min(self.window)
    }

    /// Pause between two operations drained from the overflow queue:
    /// `max(retry_after, ceil(window / max_requests))` at millisecond
    /// precision.
    #[must_use]
    pub fn spacing(&self) -> Duration {
        let max_requests = self.max_requests.max(1) as u128;
        let per_request = self.window.as_millis().div_ceil(max_requests);
        let per_request = Duration::from_millis(u64::try_from(per_request).unwrap_or(u64::MAX));
        self.retry_after.max(per_request)
    }
}
