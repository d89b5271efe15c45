use url::Url;

use crate::{ErrorKind, Result};

/// Parse a user supplied address which has to be crawlable
pub(crate) fn parse_http_url(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim()).map_err(|e| ErrorKind::ParseUrl(input.to_string(), e))?;
    if !is_http(&url) {
        return Err(ErrorKind::UnsupportedScheme(input.to_string()));
    }
    Ok(url)
}

pub(crate) fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Canonical string form of a URL used to deduplicate pages:
/// the fragment is dropped and a single trailing slash is stripped,
/// so `https://example.com/` and `https://example.com` are the same page.
pub(crate) fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    let href = url.as_str();
    href.strip_suffix('/').unwrap_or(href).to_string()
}
