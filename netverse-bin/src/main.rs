//! `netverse` searches the web and crawls websites without tripping the rate
//! limits of the services it talks to.
//!
//! The binary is a wrapper around netverse-lib, which provides the request
//! governor, the search client and the crawler.
//!
//! Search the web, image, video and news indexes of the Brave search API:
//! ```sh
//! BRAVE_API_KEY=... netverse search "rust async"
//! ```
//!
//! Only search news, printing JSON:
//! ```sh
//! netverse search "rust async" --kind news --format json
//! ```
//!
//! Crawl a website two levels deep:
//! ```sh
//! netverse crawl https://example.com --max-depth 2 --max-pages 50
//! ```
//!
//! Limits can be tuned globally or per endpoint in `netverse.toml`:
//! ```toml
//! max_requests = 5
//! window = "10s"
//!
//! [keys.crawler]
//! max_requests = 1
//! window = "2s"
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io;
use std::path::PathBuf;

use anyhow::{Error, Result, bail};
use clap::Parser;
use formatters::log::init_logging;
use log::{error, info};

#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature

mod commands;
mod formatters;
mod options;
mod verbosity;

use crate::commands::CommandParams;
use crate::commands::crawl::CrawlLimits;
use crate::options::{Command, Config, NETVERSE_CONFIG_FILE, NetverseOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    /// No search hit or crawled page, or every search index failed
    NothingFound = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't run destructors, so the actual work happens
    // in another function
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<NetverseOptions> {
    let mut opts = NetverseOptions::parse();

    init_logging(&opts.config.verbose);

    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // An invalid default config file is an error as well
        let default_config = PathBuf::from(NETVERSE_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call netverse entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let governor = match opts.config.governor() {
        Ok(governor) => governor,
        Err(e) => {
            error!("{e:#}");
            exit(ExitCode::ConfigFile as i32);
        }
    };
    info!(
        "netverse {}: {} requests per {} and endpoint",
        env!("CARGO_PKG_VERSION"),
        governor.config().max_requests,
        humantime::format_duration(governor.config().window)
    );

    let params = CommandParams {
        governor,
        cfg: opts.config,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(run(&opts.command, &params)) {
        Err(e) if Some(io::ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Run the given command
async fn run(command: &Command, params: &CommandParams) -> Result<i32> {
    let exit_code = match command {
        Command::Search { query, kind, count } => {
            commands::search(params, query, kind, *count).await?
        }
        Command::Crawl {
            url,
            max_depth,
            max_pages,
            delay,
        } => {
            let limits = CrawlLimits {
                max_depth: *max_depth,
                max_pages: *max_pages,
                delay: *delay,
            };
            commands::crawl(params, url, limits).await?
        }
    };

    Ok(exit_code as i32)
}
