use anyhow::Result;
use netverse_lib::ratelimit::KeyStatsMap;
use netverse_lib::{CrawlResult, SearchResults};
use std::fmt::{self, Write};

use super::{OutputResults, Report, ResultsFormatter};
use crate::formatters::color::{BOLD, BOLD_PINK, DIM, GREEN, PINK, color};

/// Human-readable output, one block per hit or page
pub(crate) struct Plain;

impl Plain {
    pub(crate) const fn new() -> Self {
        Self {}
    }
}

fn write_search(f: &mut String, results: &SearchResults) -> fmt::Result {
    let total = results.total_hits();
    color!(
        f,
        BOLD,
        "Results for \"{}\" ({total} {})\n",
        results.query,
        plural(total, "hit", "hits")
    )?;

    for section in &results.sections {
        writeln!(f)?;
        let kind = capitalize(&section.kind.to_string());
        if let Some(error) = &section.error {
            color!(f, BOLD_PINK, "{kind}: failed", )?;
            writeln!(f, " ({error})")?;
            continue;
        }
        color!(f, GREEN, "{kind} ({})\n", section.hits.len())?;
        for (i, hit) in section.hits.iter().enumerate() {
            writeln!(f, "{:>3}. {}", i + 1, hit.title)?;
            color!(f, DIM, "     {}\n", hit.url)?;
            if let Some(description) = &hit.description {
                writeln!(f, "     {description}")?;
            }
        }
    }
    Ok(())
}

fn write_crawl(f: &mut String, pages: &[CrawlResult]) -> fmt::Result {
    color!(
        f,
        BOLD,
        "Crawled {} {}\n",
        pages.len(),
        plural(pages.len(), "page", "pages")
    )?;

    for page in pages {
        writeln!(f)?;
        color!(f, GREEN, "[{}] ", page.depth)?;
        writeln!(f, "{}", page.title)?;
        color!(f, DIM, "    {}\n", page.url)?;
        if !page.description.is_empty() {
            writeln!(f, "    {}", page.description)?;
        }
        writeln!(f, "    {} links", page.links.len())?;
    }
    Ok(())
}

fn write_governor_stats(f: &mut String, stats: &KeyStatsMap) -> fmt::Result {
    writeln!(f)?;
    color!(f, BOLD, "Request governor\n",)?;
    if stats.is_empty() {
        return color!(f, DIM, "  no requests\n",);
    }
    for (key, key_stats) in stats.sorted() {
        color!(f, PINK, "  {key}",)?;
        writeln!(f, ": {}", key_stats.summary())?;
    }
    Ok(())
}

const fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl ResultsFormatter for Plain {
    fn format(&self, results: &OutputResults) -> Result<String> {
        let mut output = String::new();
        match &results.report {
            Report::Search(search) => write_search(&mut output, search)?,
            Report::Crawl(pages) => write_crawl(&mut output, pages)?,
        }
        if let Some(stats) = &results.governor {
            write_governor_stats(&mut output, stats)?;
        }
        Ok(output)
    }
}
