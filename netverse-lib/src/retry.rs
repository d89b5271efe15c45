use http::StatusCode;

use crate::ErrorKind;

/// An extension trait to tell whether a failure is an upstream rate-limit
/// signal.
///
/// The [`Governor`](crate::Governor) only retries failures for which this
/// returns `true`; everything else is handed back to the caller on the first
/// attempt. Operations tag rate limiting explicitly with
/// [`ErrorKind::RateLimited`], but a rejected `429` or a `reqwest` error
/// produced by `error_for_status` are recognised as well.
pub trait RateLimitExt {
    /// Returns `true` if the failure means "slow down and try again later".
    fn is_rate_limited(&self) -> bool;
}

impl RateLimitExt for StatusCode {
    fn is_rate_limited(&self) -> bool {
        *self == StatusCode::TOO_MANY_REQUESTS
    }
}

impl RateLimitExt for reqwest::Error {
    fn is_rate_limited(&self) -> bool {
        // Only set if `Response::error_for_status` produced the error
        self.status().is_some_and(|status| status.is_rate_limited())
    }
}

impl RateLimitExt for ErrorKind {
    fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::RejectedStatusCode(status) => status.is_rate_limited(),
            _ => self.reqwest_error().is_some_and(RateLimitExt::is_rate_limited),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;

    use super::RateLimitExt;
    use crate::ErrorKind;
    use crate::ratelimit::{GovernorKey, RateLimitError};

    #[test]
    fn test_status_codes() {
        assert!(StatusCode::TOO_MANY_REQUESTS.is_rate_limited());
        assert!(!StatusCode::SERVICE_UNAVAILABLE.is_rate_limited());
        assert!(!StatusCode::FORBIDDEN.is_rate_limited());
        assert!(!StatusCode::OK.is_rate_limited());
    }

    #[test]
    fn test_error_kinds() {
        assert!(ErrorKind::RateLimited { retry_after: None }.is_rate_limited());
        assert!(
            ErrorKind::RateLimited {
                retry_after: Some(Duration::from_secs(1))
            }
            .is_rate_limited()
        );
        assert!(ErrorKind::RejectedStatusCode(StatusCode::TOO_MANY_REQUESTS).is_rate_limited());
        assert!(!ErrorKind::RejectedStatusCode(StatusCode::BAD_REQUEST).is_rate_limited());
        assert!(!ErrorKind::EmptyQuery.is_rate_limited());
        // A full queue is a verdict of the governor itself, not an upstream signal
        assert!(
            !ErrorKind::from(RateLimitError::QueueFull {
                key: GovernorKey::from("crawler"),
                capacity: 4,
            })
            .is_rate_limited()
        );
    }

    #[tokio::test]
    async fn test_reqwest_status_error() {
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let err = reqwest::get(mock_server.uri())
            .await
            .unwrap()
            .error_for_status()
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert!(ErrorKind::NetworkRequest(err).is_rate_limited());
    }
}
