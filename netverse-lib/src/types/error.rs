use http::StatusCode;
use serde::{Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

use crate::ratelimit::RateLimitError;

/// Possible errors when interacting with `netverse_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while handling request.
    /// This does not include erroneous status codes, `RejectedStatusCode` will be used in that case.
    #[error("Network error")]
    NetworkRequest(#[source] reqwest::Error),

    /// Cannot read the body of the received response
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The network client required for making requests cannot be created
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// The upstream service rejected the request because of its own rate limit.
    ///
    /// Operations run through the [`Governor`](crate::Governor) return this
    /// variant to signal that the call should be retried with backoff instead
    /// of failing outright.
    #[error("Rate limited by upstream{}", match .retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    })]
    RateLimited {
        /// Delay requested by the server through `Retry-After`, if any
        retry_after: Option<Duration>,
    },

    /// The request returned a status code that is not accepted
    #[error("Rejected status code: {0}")]
    RejectedStatusCode(StatusCode),

    /// The request governor refused or dropped the operation
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The given string can not be parsed into a valid URL
    #[error("Cannot parse {0} as website url: {1}")]
    ParseUrl(String, #[source] url::ParseError),

    /// The URL uses a scheme other than `http` or `https`
    #[error("Unsupported URL scheme in {0}; only http and https can be crawled")]
    UnsupportedScheme(String),

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The search query is empty after trimming
    #[error("Search query must not be empty")]
    EmptyQuery,

    /// The search API could not be called because of a missing API key.
    #[error("Brave API key not specified. Use the `--api-key` flag / `BRAVE_API_KEY` env var.")]
    MissingApiKey,
}

impl ErrorKind {
    /// Return the underlying `reqwest::Error`, if any
    #[must_use]
    pub const fn reqwest_error(&self) -> Option<&reqwest::Error> {
        match self {
            Self::NetworkRequest(e) | Self::ReadResponseBody(e) | Self::BuildRequestClient(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// The delay the upstream asked for in a `Retry-After` header, if this
    /// error carries one
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Returns `true` if the governor gave up on the operation for throttling
    /// reasons: either the upstream kept rate limiting it or the overflow
    /// queue was full.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::RateLimit(RateLimitError::QueueFull { .. })
        )
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<url::ParseError> for ErrorKind {
    fn from(e: url::ParseError) -> Self {
        Self::ParseUrl("Cannot parse URL".to_string(), e)
    }
}

impl From<(String, url::ParseError)> for ErrorKind {
    fn from(value: (String, url::ParseError)) -> Self {
        Self::ParseUrl(value.0, value.1)
    }
}
