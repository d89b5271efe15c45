use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use crate::{formatters::color::color_for_level, verbosity::Verbosity};

/// Width of the widest level prefix, `[ERROR]`
const LEVEL_PREFIX_WIDTH: usize = 7;

/// Initialize the logging system with the given verbosity level.
///
/// Log lines always go to stderr, so that stdout only carries results.
pub(crate) fn init_logging(verbose: &Verbosity) {
    // RUST_LOG overrides the flags entirely
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        // Dependencies only report warnings, our own crates follow `-v`/`-q`
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("netverse", verbose.log_level_filter())
            .filter_module("netverse_lib", verbose.log_level_filter());
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let prefix = format!("[{level}]");
        writeln!(
            buf,
            "{} {}",
            color_for_level(level).apply_to(format!("{prefix:>LEVEL_PREFIX_WIDTH$}")),
            record.args()
        )
    });

    builder.init();
}
