mod json;
mod plain;

pub(crate) use json::Json;
pub(crate) use plain::Plain;

use anyhow::Result;
use netverse_lib::ratelimit::KeyStatsMap;
use netverse_lib::{CrawlResult, SearchResults};
use serde::Serialize;

/// What a command found
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Report {
    /// Hits of all searched indexes
    Search(SearchResults),
    /// Crawled pages in visit order
    Crawl(Vec<CrawlResult>),
}

/// Everything printed at the end of a run
#[derive(Debug, Serialize)]
pub(crate) struct OutputResults {
    #[serde(flatten)]
    pub(crate) report: Report,
    /// Only present with `--governor-stats`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) governor: Option<KeyStatsMap>,
}

pub(crate) trait ResultsFormatter {
    /// Render the results of a run for stdout
    fn format(&self, results: &OutputResults) -> Result<String>;
}
