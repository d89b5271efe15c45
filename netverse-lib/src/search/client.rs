use futures::{FutureExt, future::BoxFuture, future::join_all};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use typed_builder::TypedBuilder;
use url::Url;

use super::cache::{ResponseCache, cache_key};
use super::types::ApiResponse;
use crate::ratelimit::headers;
use crate::retry::RateLimitExt;
use crate::search::{SearchHit, SearchKind, SearchResults, SearchSection};
use crate::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ErrorKind, Governor, Result};

/// Address of the Brave search API
pub const DEFAULT_BASE_URL: &str = "https://api.search.brave.com/";
/// Number of results requested per endpoint, 10.
pub const DEFAULT_RESULT_COUNT: usize = 10;
/// Lifetime of cached responses, 15 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
/// Upper bound of the pause before the last-chance retry of a throttled
/// endpoint, 2 seconds.
pub const DEFAULT_RETRY_WAIT_TIME: Duration = Duration::from_secs(2);

static SUBSCRIPTION_TOKEN: HeaderName = HeaderName::from_static("x-subscription-token");

/// Builder for [`SearchClient`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `SearchClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `SearchClientBuilder`.
"))]
pub struct SearchClientBuilder {
    /// Brave search API subscription token. Required.
    api_key: Option<SecretString>,

    /// Governor throttling the endpoints.
    ///
    /// Pass a shared governor to make several clients (or a crawler) respect
    /// the same limits. A governor with default limits is created otherwise.
    governor: Option<Governor>,

    /// API base URL, defaults to [`DEFAULT_BASE_URL`].
    base_url: Option<Url>,

    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,

    /// Response timeout per request.
    timeout: Option<Duration>,

    /// Number of results requested per endpoint.
    #[builder(default = DEFAULT_RESULT_COUNT)]
    result_count: usize,

    /// How long responses are served from the cache. Zero disables caching.
    #[builder(default = DEFAULT_CACHE_TTL)]
    cache_ttl: Duration,

    /// Upper bound of the pause before the single extra attempt made after
    /// the governor gave up on a throttled endpoint. A shorter `Retry-After`
    /// sent by the API wins.
    #[builder(default = DEFAULT_RETRY_WAIT_TIME)]
    retry_wait_time: Duration,
}

impl Default for SearchClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SearchClientBuilder {
    /// Instantiates a [`SearchClient`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - No API key is set or it is blank.
    /// - The user-agent or the API key are no valid header values.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<SearchClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(ErrorKind::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let mut token = HeaderValue::from_str(api_key.expose_secret().trim())?;
        token.set_sensitive(true);
        headers.insert(SUBSCRIPTION_TOKEN.clone(), token);

        let timeout = self
            .timeout
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ErrorKind::BuildRequestClient)?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        Ok(SearchClient {
            client,
            governor: self.governor.unwrap_or_default(),
            base_url,
            result_count: self.result_count.to_string(),
            cache: Arc::new(ResponseCache::new(self.cache_ttl)),
            retry_wait_time: self.retry_wait_time,
        })
    }
}

/// Fans queries out to the search endpoints, each throttled by its own
/// governor key and served from a short-lived cache where possible.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    governor: Governor,
    base_url: Url,
    result_count: String,
    cache: Arc<ResponseCache<Vec<SearchHit>>>,
    retry_wait_time: Duration,
}

impl SearchClient {
    /// Search all `kinds` concurrently. An empty slice means every kind.
    ///
    /// A failing endpoint does not fail the search: its section stays empty
    /// and carries the error message.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::EmptyQuery`] if the query is blank.
    pub async fn search(&self, query: &str, kinds: &[SearchKind]) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ErrorKind::EmptyQuery);
        }

        let mut requested: Vec<SearchKind> = Vec::new();
        if kinds.is_empty() {
            requested.extend(SearchKind::iter());
        } else {
            for kind in kinds {
                if !requested.contains(kind) {
                    requested.push(*kind);
                }
            }
        }

        let sections = join_all(requested.into_iter().map(|kind| async move {
            match self.search_kind(kind, query).await {
                Ok(hits) => SearchSection {
                    kind,
                    hits,
                    error: None,
                },
                Err(e) => {
                    log::warn!("{kind} search for '{query}' failed: {e}");
                    SearchSection {
                        kind,
                        hits: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            }
        }))
        .await;

        Ok(SearchResults {
            query: query.to_string(),
            sections,
        })
    }

    /// Query a single endpoint.
    ///
    /// Cached responses are returned without touching the governor. If the
    /// governor gives up because the endpoint stays throttled, one more
    /// attempt is made after [`retry_wait_time`](SearchClientBuilder) (or a
    /// shorter `Retry-After`).
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the query is blank, the API rejects the request,
    /// the endpoint stays throttled or the response cannot be read.
    pub async fn search_kind(&self, kind: SearchKind, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ErrorKind::EmptyQuery);
        }

        let key = cache_key(kind, query);
        if let Some(hits) = self.cache.get(&key) {
            log::debug!("{kind} search for '{query}' served from cache");
            return Ok(hits);
        }

        let endpoint = kind
            .endpoint(&self.base_url)
            .map_err(|e| ErrorKind::ParseUrl(self.base_url.to_string(), e))?;

        let hits = match self
            .governor
            .execute(kind.governor_key(), self.operation(&endpoint, query))
            .await
        {
            Err(e) if e.is_throttled() => {
                let delay = e
                    .retry_after()
                    .map_or(self.retry_wait_time, |d| d.min(self.retry_wait_time));
                log::warn!(
                    "{kind} search throttled ({e}), last attempt in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                self.governor
                    .execute(kind.governor_key(), self.operation(&endpoint, query))
                    .await?
            }
            result => result?,
        };

        self.cache.insert(key, hits.clone());
        Ok(hits)
    }

    /// A re-invocable request against one endpoint
    fn operation(
        &self,
        endpoint: &Url,
        query: &str,
    ) -> impl Fn() -> BoxFuture<'static, Result<Vec<SearchHit>>> + Send + 'static {
        let client = self.client.clone();
        let endpoint = endpoint.clone();
        let query = query.to_string();
        let count = self.result_count.clone();
        move || {
            let request = client
                .get(endpoint.clone())
                .query(&[("q", query.as_str()), ("count", count.as_str())]);
            send(request).boxed()
        }
    }

    /// The governor throttling this client, e.g. to read its statistics
    #[must_use]
    pub const fn governor(&self) -> &Governor {
        &self.governor
    }
}

async fn send(request: RequestBuilder) -> Result<Vec<SearchHit>> {
    let response = request.send().await.map_err(ErrorKind::NetworkRequest)?;
    let status = response.status();

    if status.is_rate_limited() {
        return Err(ErrorKind::RateLimited {
            retry_after: headers::retry_after(response.headers()),
        });
    }
    if let (Some(remaining), limit) =
        headers::parse_common_rate_limit_header_fields(response.headers())
    {
        log::debug!(
            "{}: {remaining} of {} requests left",
            response.url().path(),
            limit.map_or_else(|| "?".to_string(), |l| l.to_string())
        );
    }
    if !status.is_success() {
        return Err(ErrorKind::RejectedStatusCode(status));
    }

    let body: ApiResponse = response.json().await.map_err(ErrorKind::ReadResponseBody)?;
    Ok(body.into_hits())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::GovernorConfig;

    fn web_body() -> serde_json::Value {
        json!({
            "web": {
                "results": [
                    { "title": "The Rust Book", "url": "https://doc.rust-lang.org/book/", "description": "Learn Rust" },
                    { "title": "Rust by Example", "url": "https://doc.rust-lang.org/rust-by-example/" }
                ]
            }
        })
    }

    /// Limits small enough for tests against a real clock
    fn fast_governor() -> Governor {
        Governor::new(GovernorConfig {
            max_requests: 10,
            window: Duration::from_millis(100),
            retry_after: Duration::from_millis(10),
            max_retries: 1,
            queue_size: 10,
        })
        .unwrap()
    }

    fn client(server: &MockServer) -> SearchClient {
        SearchClientBuilder::builder()
            .api_key(SecretString::from("secret-token"))
            .base_url(Url::parse(&server.uri()).unwrap())
            .governor(fast_governor())
            .retry_wait_time(Duration::from_millis(20))
            .build()
            .client()
            .unwrap()
    }

    #[tokio::test]
    async fn test_web_search() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("q", "rust book"))
            .and(query_param("count", "10"))
            .and(header("x-subscription-token", "secret-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(web_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let hits = client(&mock_server)
            .search_kind(SearchKind::Web, "  rust book ")
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "The Rust Book");
        assert_eq!(hits[0].description.as_deref(), Some("Learn Rust"));
        assert_eq!(
            hits[1].favicon.as_ref().map(Url::as_str),
            Some("https://www.google.com/s2/favicons?domain=doc.rust-lang.org&sz=32")
        );
    }

    #[tokio::test]
    async fn test_responses_are_cached_per_kind() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(web_body()))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/res/v1/news/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let first = client.search_kind(SearchKind::Web, "rust").await.unwrap();
        let second = client.search_kind(SearchKind::Web, "rust").await.unwrap();
        assert_eq!(first, second);
        assert!(client.search_kind(SearchKind::News, "rust").await.unwrap().is_empty());

        assert_eq!(client.governor().key_stats("brave-api-web").admitted, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_endpoint_gives_up() {
        let mock_server = MockServer::start().await;
        // Two inline attempts and one from the queue, twice
        Mock::given(method("GET"))
            .and(path("/res/v1/images/search"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(6)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let err = client
            .search_kind(SearchKind::Images, "ferris")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ErrorKind::RateLimited {
                retry_after: Some(Duration::ZERO)
            }
        ));

        let stats = client.governor().key_stats("brave-api-images");
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.rate_limit_signals, 4);
    }

    #[tokio::test]
    async fn test_rate_limited_endpoint_recovers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(web_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let hits = client.search_kind(SearchKind::Web, "rust").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(client.governor().key_stats("brave-api-web").retries, 1);
    }

    #[tokio::test]
    async fn test_failing_kind_leaves_empty_section() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(web_body()))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/res/v1/news/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let results = client(&mock_server)
            .search("rust", &[SearchKind::Web, SearchKind::News, SearchKind::Web])
            .await
            .unwrap();

        assert_eq!(results.query, "rust");
        assert_eq!(results.sections.len(), 2);
        assert_eq!(results.total_hits(), 2);
        assert!(!results.all_failed());

        let news = results.section(SearchKind::News).unwrap();
        assert!(news.hits.is_empty());
        assert!(news.error.as_deref().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_search_all_kinds_by_default() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(4)
            .mount(&mock_server)
            .await;

        let client = client(&mock_server);
        let results = client.search("rust", &[]).await.unwrap();
        let kinds: Vec<_> = results.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SearchKind::iter().collect::<Vec<_>>());
        assert_eq!(client.governor().active_key_count(), 4);
    }

    #[tokio::test]
    async fn test_empty_query() {
        let mock_server = MockServer::start().await;
        let client = client(&mock_server);
        assert!(matches!(
            client.search("   ", &[]).await,
            Err(ErrorKind::EmptyQuery)
        ));
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            SearchClientBuilder::default().client(),
            Err(ErrorKind::MissingApiKey)
        ));
        assert!(matches!(
            SearchClientBuilder::builder()
                .api_key(SecretString::from(" "))
                .build()
                .client(),
            Err(ErrorKind::MissingApiKey)
        ));
    }
}
