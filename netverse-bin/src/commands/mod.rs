pub(crate) mod crawl;
pub(crate) mod search;

pub(crate) use crawl::crawl;
pub(crate) use search::search;

use anyhow::Result;
use netverse_lib::Governor;
use std::io::{self, Write};

use crate::formatters::get_results_formatter;
use crate::formatters::results::{OutputResults, Report};
use crate::options::Config;

/// Parameters passed to every command
pub(crate) struct CommandParams {
    /// Shared by every request of the run
    pub(crate) governor: Governor,
    pub(crate) cfg: Config,
}

/// Print the report, followed by the governor statistics if requested
fn print_results(report: Report, params: &CommandParams) -> Result<()> {
    let results = OutputResults {
        report,
        governor: params
            .cfg
            .governor_stats
            .then(|| params.governor.all_key_stats()),
    };
    let formatted = get_results_formatter(params.cfg.format).format(&results)?;

    // Piping into e.g. `head` closes stdout early
    match writeln!(io::stdout(), "{}", formatted.trim_end()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        res => Ok(res?),
    }
}
