use serde::{Deserialize, Serialize};
use url::Url;

use crate::search::SearchKind;

/// Base of the favicon service used for result icons
const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

/// A single normalised search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Title of the result
    pub title: String,
    /// Address of the result
    pub url: Url,
    /// Snippet or description, if the endpoint returns one
    pub description: Option<String>,
    /// Preview image, e.g. of an image or video result
    pub thumbnail: Option<Url>,
    /// Favicon of the result's host
    pub favicon: Option<Url>,
}

/// Favicon address for the host of `url`:
/// `https://www.google.com/s2/favicons?domain=<host>&sz=32`
///
/// # Examples
///
/// ```
/// use netverse_lib::search::favicon_url;
/// use url::Url;
///
/// let url = Url::parse("https://docs.rs/tokio").unwrap();
/// assert_eq!(
///     favicon_url(&url).unwrap().as_str(),
///     "https://www.google.com/s2/favicons?domain=docs.rs&sz=32"
/// );
/// ```
#[must_use]
pub fn favicon_url(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    Url::parse_with_params(FAVICON_SERVICE, &[("domain", host), ("sz", "32")]).ok()
}

/// The results of one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSection {
    /// Endpoint the hits come from
    pub kind: SearchKind,
    /// Hits in the order returned by the API
    pub hits: Vec<SearchHit>,
    /// Why the endpoint returned nothing, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchSection {
    /// Whether this endpoint failed
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregated results of a query over several endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// The query as sent
    pub query: String,
    /// One section per requested endpoint, in request order
    pub sections: Vec<SearchSection>,
}

impl SearchResults {
    /// Number of hits over all sections
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.sections.iter().map(|section| section.hits.len()).sum()
    }

    /// The section of one endpoint, if it was requested
    #[must_use]
    pub fn section(&self, kind: SearchKind) -> Option<&SearchSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    /// `true` if every requested endpoint failed
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.sections.is_empty() && self.sections.iter().all(SearchSection::is_failure)
    }
}

/// Response body of the search endpoints. The web endpoint nests its
/// results under `web`, the others return them at the top level.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    web: Option<ResultList>,
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail: Option<RawThumbnail>,
    #[serde(default)]
    properties: Option<RawProperties>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    #[serde(default)]
    src: Option<String>,
}

/// Extra fields of image results
#[derive(Debug, Deserialize)]
struct RawProperties {
    #[serde(default)]
    url: Option<String>,
}

impl ApiResponse {
    /// Normalise the response. Results without a valid URL are dropped.
    pub(crate) fn into_hits(self) -> Vec<SearchHit> {
        self.web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .chain(self.results)
            .filter_map(RawResult::into_hit)
            .collect()
    }
}

impl RawResult {
    fn into_hit(self) -> Option<SearchHit> {
        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Dropping search result with invalid URL {}: {e}", self.url);
                return None;
            }
        };
        let thumbnail = self
            .thumbnail
            .and_then(|thumbnail| thumbnail.src)
            .or_else(|| self.properties.and_then(|properties| properties.url))
            .and_then(|src| Url::parse(&src).ok());
        let title = if self.title.trim().is_empty() {
            url.to_string()
        } else {
            self.title
        };

        Some(SearchHit {
            favicon: favicon_url(&url),
            title,
            url,
            description: self.description.filter(|d| !d.trim().is_empty()),
            thumbnail,
        })
    }
}
