use anyhow::{Context, Result};

use super::{OutputResults, ResultsFormatter};

pub(crate) struct Json;

impl Json {
    pub(crate) const fn new() -> Self {
        Self {}
    }
}

impl ResultsFormatter for Json {
    /// Format results as JSON object
    fn format(&self, results: &OutputResults) -> Result<String> {
        serde_json::to_string_pretty(results).context("Cannot format results as JSON")
    }
}
