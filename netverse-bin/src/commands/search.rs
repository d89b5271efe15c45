use anyhow::{Context, Result};
use log::error;
use netverse_lib::{DEFAULT_USER_AGENT, ErrorKind, SearchClientBuilder, SearchKind};

use super::{CommandParams, print_results};
use crate::ExitCode;
use crate::formatters::results::Report;

/// Search all requested indexes and print the hits
pub(crate) async fn search(
    params: &CommandParams,
    query: &str,
    kinds: &[SearchKind],
    count: usize,
) -> Result<ExitCode> {
    let cfg = &params.cfg;
    let client = SearchClientBuilder::builder()
        .api_key(cfg.api_key.clone())
        .governor(params.governor.clone())
        .base_url(cfg.base_url.clone())
        .user_agent(
            cfg.user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        )
        .timeout(cfg.timeout())
        .result_count(count)
        .build()
        .client();

    let client = match client {
        Ok(client) => client,
        Err(e @ ErrorKind::MissingApiKey) => {
            error!("{e}");
            return Ok(ExitCode::ConfigFile);
        }
        Err(e) => return Err(e).context("Cannot create search client"),
    };

    let results = client.search(query, kinds).await?;
    // Failed sections have already been logged by the client
    let found = !results.all_failed() && results.total_hits() > 0;

    print_results(Report::Search(results), params)?;

    Ok(if found {
        ExitCode::Success
    } else {
        ExitCode::NothingFound
    })
}
