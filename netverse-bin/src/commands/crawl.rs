use anyhow::{Context, Result};
use log::info;
use netverse_lib::CrawlerBuilder;
use netverse_lib::crawler::DEFAULT_CRAWLER_USER_AGENT;
use std::time::{Duration, Instant};

use super::{CommandParams, print_results};
use crate::ExitCode;
use crate::formatters::results::Report;

/// Limits of a single crawl
#[derive(Debug, Clone, Copy)]
pub(crate) struct CrawlLimits {
    pub(crate) max_depth: usize,
    pub(crate) max_pages: usize,
    pub(crate) delay: Duration,
}

/// Crawl from `seed` and print the visited pages
pub(crate) async fn crawl(
    params: &CommandParams,
    seed: &str,
    limits: CrawlLimits,
) -> Result<ExitCode> {
    let cfg = &params.cfg;
    let crawler = CrawlerBuilder::builder()
        .governor(params.governor.clone())
        .max_depth(limits.max_depth)
        .max_pages(limits.max_pages)
        .delay(limits.delay)
        .user_agent(
            cfg.user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_CRAWLER_USER_AGENT.to_string()),
        )
        .timeout(cfg.timeout())
        .build()
        .crawler()
        .context("Cannot create crawler")?;

    let start = Instant::now();
    let pages = crawler.crawl(seed).await?;
    info!(
        "Crawled {} pages in {}",
        pages.len(),
        humantime::format_duration(Duration::from_secs(start.elapsed().as_secs()))
    );

    let exit_code = if pages.is_empty() {
        ExitCode::NothingFound
    } else {
        ExitCode::Success
    };
    print_results(Report::Crawl(pages), params)?;
    Ok(exit_code)
}
