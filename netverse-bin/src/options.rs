use crate::verbosity::Verbosity;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use const_format::{concatcp, formatcp};
use netverse_lib::crawler::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES};
use netverse_lib::search::DEFAULT_RESULT_COUNT;
use netverse_lib::{DEFAULT_TIMEOUT_SECS, Governor, GovernorConfig, KeyConfigs, SearchKind};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};
use strum::{Display, EnumIter, EnumString, VariantNames};
use url::Url;

pub(crate) const NETVERSE_CONFIG_FILE: &str = "netverse.toml";

const DEFAULT_CRAWL_DELAY: &str = "1s";

// clap wants `&str` defaults, serde wants typed values
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
const RESULT_COUNT_STR: &str = concatcp!(DEFAULT_RESULT_COUNT);
const MAX_DEPTH_STR: &str = concatcp!(DEFAULT_MAX_DEPTH);
const MAX_PAGES_STR: &str = concatcp!(DEFAULT_MAX_PAGES);
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    NETVERSE_CONFIG_FILE,
);

/// The format of the results printed to stdout
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumIter, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OutputFormat {
    /// Human-readable text, colored on terminals which support it.
    #[default]
    Plain,

    /// A single JSON document, for scripting.
    Json,
}

impl OutputFormat {
    /// Returns `true` if results are printed as JSON
    pub(crate) const fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

default_function! {
    timeout: u64 = DEFAULT_TIMEOUT_SECS;
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// netverse searches the web through the Brave search API and crawls
/// websites, without ever sending more requests than the remote side allows.
///
/// Every outbound call goes through a request governor that admits at most
/// `--max-requests` calls per `--window` and per endpoint, backs off when
/// the remote side rate limits and queues what cannot be sent yet.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct NetverseOptions {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Configuration file to use
    #[arg(short, long = "config", global = true)]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

/// What to do
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Search the web, image, video and news indexes at once
    Search {
        /// Search terms
        query: String,

        /// Indexes to search, comma separated: web, images, videos, news.
        /// All of them by default.
        #[arg(short, long, value_delimiter = ',')]
        kind: Vec<SearchKind>,

        /// Number of results requested per index
        #[arg(short = 'n', long, default_value = RESULT_COUNT_STR)]
        count: usize,
    },

    /// Crawl a website breadth-first, starting at the given URL
    Crawl {
        /// Seed URL (http or https)
        url: String,

        /// Number of link hops followed from the seed
        #[arg(short = 'd', long, default_value = MAX_DEPTH_STR)]
        max_depth: usize,

        /// Maximum number of pages visited
        #[arg(short = 'p', long, default_value = MAX_PAGES_STR)]
        max_pages: usize,

        /// Pause between two page fetches, e.g. `500ms` or `2s`
        #[arg(long, default_value = DEFAULT_CRAWL_DELAY, value_parser = humantime::parse_duration)]
        delay: Duration,
    },
}

/// Options shared by all commands.
///
/// Each of them can also be set in the configuration file; values given on
/// the command line win.
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Output format of the results
    #[arg(short, long, global = true, default_value = "plain")]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    /// Maximum number of requests per endpoint within one window (default: 3)
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) max_requests: Option<usize>,

    /// Length of the rolling rate limit window (default: 30s)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) window: Option<Duration>,

    /// Base delay of the exponential backoff when an endpoint is throttled
    /// (default: 1s)
    ///
    /// The n-th retry waits `retry-after * 2^n`, but never longer than the
    /// window. Queued requests are also never sent closer together than this.
    #[arg(long, global = true, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) retry_after: Option<Duration>,

    /// Number of retries before a throttled request is queued (default: 3)
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) max_retries: Option<u32>,

    /// Maximum number of queued requests per endpoint (default: 100)
    ///
    /// Requests beyond this limit fail right away instead of waiting.
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) queue_size: Option<usize>,

    /// Brave search API subscription token
    #[arg(long, global = true, env = "BRAVE_API_KEY", hide_env_values = true)]
    #[serde(default)]
    pub(crate) api_key: Option<SecretString>,

    /// Base URL of the search API
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) base_url: Option<Url>,

    /// Timeout in seconds of a single request
    #[arg(short, long, global = true, default_value = TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// User agent for all requests.
    /// By default searches and crawls identify themselves differently.
    #[arg(short, long, global = true, verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,

    /// Print request governor statistics per endpoint after the results
    #[arg(long, global = true)]
    #[serde(default)]
    pub(crate) governor_stats: bool,

    /// Per-endpoint limits from the config file
    #[arg(skip)]
    #[serde(default)]
    pub(crate) keys: KeyConfigs,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // SecretBox doesn't implement Eq
        if self.api_key.is_none() && toml.api_key.is_some() {
            self.api_key = toml.api_key;
        }

        // Per-key limits can only be given in TOML
        self.keys = toml.keys;

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..api_key,
                ..keys,

                // Keys with defaults to assign
                base_url: None,
                format: OutputFormat::Plain,
                governor_stats: false,
                max_requests: None,
                max_retries: None,
                queue_size: None,
                retry_after: None,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: None,
                verbose: Verbosity::default(),
                window: None,
            }
        }
    }

    /// Global governor limits, falling back to the defaults
    pub(crate) fn governor_config(&self) -> GovernorConfig {
        GovernorConfig::from_options(
            self.max_requests,
            self.window,
            self.retry_after,
            self.max_retries,
            self.queue_size,
        )
    }

    /// Create the governor shared by all requests of this run
    pub(crate) fn governor(&self) -> Result<Governor> {
        Governor::with_key_configs(self.governor_config(), self.keys.clone())
            .context("Invalid rate limit configuration")
    }

    pub(crate) const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
