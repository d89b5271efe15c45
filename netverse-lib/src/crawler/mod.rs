//! Breadth-first crawling of websites.
//!
//! Every page fetch goes through the shared [`Governor`] under a single key
//! (`crawler` by default), on top of a fixed politeness delay between pages.

use http::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, SystemTime};
use typed_builder::TypedBuilder;
use url::Url;

use crate::extract::extract_page;
use crate::ratelimit::headers;
use crate::retry::RateLimitExt;
use crate::utils::url::{normalize_url, parse_http_url};
use crate::{DEFAULT_TIMEOUT_SECS, ErrorKind, Governor, GovernorKey, Result};

/// Governor key shared by all page fetches, unless configured otherwise
pub const DEFAULT_CRAWLER_KEY: &str = "crawler";
/// Default user agent of the crawler
pub const DEFAULT_CRAWLER_USER_AGENT: &str = "NetverseLab-Crawler/1.0";
/// Default number of link hops followed from the seed, 2.
pub const DEFAULT_MAX_DEPTH: usize = 2;
/// Default number of pages visited per crawl, 100.
pub const DEFAULT_MAX_PAGES: usize = 100;
/// Default pause between two page fetches, 1 second.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// What the crawler learned about one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Normalised address of the page
    pub url: String,
    /// Page title, or the address if the page has none
    pub title: String,
    /// Meta description or the beginning of the first paragraph,
    /// empty if the page has neither
    pub description: String,
    /// Outgoing http(s) links, normalised and deduplicated
    pub links: Vec<String>,
    /// Link hops from the seed page
    pub depth: usize,
    /// When the page was fetched
    #[serde(with = "humantime_serde")]
    pub last_crawled: SystemTime,
}

/// Builder for [`Crawler`].
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
pub struct CrawlerBuilder {
    /// Governor throttling the page fetches. A governor with default limits
    /// is created if none is given.
    governor: Option<Governor>,

    /// Governor key of the page fetches.
    #[builder(default_code = "GovernorKey::from(DEFAULT_CRAWLER_KEY)")]
    key: GovernorKey,

    /// Maximum number of link hops from the seed. The seed itself has depth
    /// zero; links found on a page at `max_depth` are not followed.
    #[builder(default = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Maximum number of pages visited, failed ones included.
    #[builder(default = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Pause between two page fetches, independent of the governor.
    #[builder(default = DEFAULT_DELAY)]
    delay: Duration,

    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_CRAWLER_USER_AGENT)")]
    user_agent: String,

    /// Response timeout per request.
    timeout: Option<Duration>,
}

impl Default for CrawlerBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CrawlerBuilder {
    /// Instantiates a [`Crawler`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the user-agent is invalid or the request client
    /// cannot be created.
    pub fn crawler(self) -> Result<Crawler> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        let timeout = self
            .timeout
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ErrorKind::BuildRequestClient)?;

        Ok(Crawler {
            client,
            governor: self.governor.unwrap_or_default(),
            key: self.key,
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            delay: self.delay,
        })
    }
}

/// Crawls a website breadth-first from a seed URL
#[derive(Debug, Clone)]
pub struct Crawler {
    client: reqwest::Client,
    governor: Governor,
    key: GovernorKey,
    max_depth: usize,
    max_pages: usize,
    delay: Duration,
}

impl Crawler {
    /// Crawl from `seed`, returning the pages in visit order.
    ///
    /// Pages are visited level by level. Every URL is visited at most once,
    /// and at most `max_pages` URLs are visited in total. A page that cannot
    /// be fetched is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if `seed` is not a valid http(s) URL.
    pub async fn crawl(&self, seed: &str) -> Result<Vec<CrawlResult>> {
        let seed = normalize_url(&parse_http_url(seed)?);

        let mut queue = VecDeque::from([(seed.clone(), 0)]);
        let mut discovered = HashSet::from([seed]);
        let mut results = Vec::new();
        let mut visited = 0;

        while visited < self.max_pages {
            let Some((url, depth)) = queue.pop_front() else {
                break;
            };
            if visited > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            visited += 1;

            match self.crawl_page(&url, depth).await {
                Ok(page) => {
                    log::info!("Crawled {url} (depth {depth}, {} links)", page.links.len());
                    if depth < self.max_depth {
                        for link in &page.links {
                            if discovered.insert(link.clone()) {
                                queue.push_back((link.clone(), depth + 1));
                            }
                        }
                    }
                    results.push(page);
                }
                Err(e) => log::warn!("Error crawling {url}: {e}"),
            }
        }

        log::debug!(
            "Crawl finished: {visited} visited, {} results, {} left in queue",
            results.len(),
            queue.len()
        );
        Ok(results)
    }

    /// Fetch and summarise a single page through the governor
    async fn crawl_page(&self, url: &str, depth: usize) -> Result<CrawlResult> {
        let page_url = Url::parse(url).map_err(|e| ErrorKind::ParseUrl(url.to_string(), e))?;

        let client = self.client.clone();
        let target = page_url.clone();
        let html = self
            .governor
            .execute(self.key.clone(), move || {
                fetch_html(client.clone(), target.clone())
            })
            .await?;

        let summary = extract_page(&html, &page_url);
        Ok(CrawlResult {
            url: url.to_string(),
            title: summary.title.clone().unwrap_or_else(|| url.to_string()),
            description: summary.description().unwrap_or_default(),
            links: summary.links,
            depth,
            last_crawled: SystemTime::now(),
        })
    }

    /// The governor throttling this crawler
    #[must_use]
    pub const fn governor(&self) -> &Governor {
        &self.governor
    }
}

async fn fetch_html(client: reqwest::Client, url: Url) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(ErrorKind::NetworkRequest)?;
    let status = response.status();

    if status.is_rate_limited() {
        return Err(ErrorKind::RateLimited {
            retry_after: headers::retry_after(response.headers()),
        });
    }
    if !status.is_success() {
        return Err(ErrorKind::RejectedStatusCode(status));
    }
    response.text().await.map_err(ErrorKind::ReadResponseBody)
}
