//! `-v` / `-q` flags controlling how much netverse logs.
//!
//! Without flags only info messages and above are shown. Every `-v` lowers
//! the threshold by one level (debug, then trace), every `-q` raises it
//! (warn, then error).

use log::{Level, LevelFilter};
use serde::Deserialize;
use std::fmt;

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// Increase log output, repeatable (`-v` shows governor decisions)
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet",
    )]
    verbose: u8,

    /// Decrease log output, repeatable
    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// The most detailed level which is still logged
    pub(crate) const fn log_level(&self) -> Level {
        level_enum(self.verbosity())
    }

    pub(crate) fn log_level_filter(&self) -> LevelFilter {
        self.log_level().to_level_filter()
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn verbosity(&self) -> i8 {
        level_value(Level::Info) - (self.quiet as i8) + (self.verbose as i8)
    }
}

// A config file names the level directly, e.g. `verbose = "debug"`
impl<'de> Deserialize<'de> for Verbosity {
    #[allow(clippy::cast_sign_loss)]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let level = match s.to_lowercase().as_str() {
            "error" => Level::Error,
            "warn" | "warning" => Level::Warn,
            "info" => Level::Info,
            "debug" => Level::Debug,
            "trace" => Level::Trace,
            level => {
                return Err(serde::de::Error::custom(format!(
                    "invalid log level `{level}`"
                )));
            }
        };
        let offset = level_value(level) - level_value(Level::Info);
        Ok(if offset >= 0 {
            Verbosity {
                verbose: offset as u8,
                quiet: 0,
            }
        } else {
            Verbosity {
                verbose: 0,
                quiet: offset.unsigned_abs(),
            }
        })
    }
}

const fn level_value(level: Level) -> i8 {
    match level {
        Level::Error => 0,
        Level::Warn => 1,
        Level::Info => 2,
        Level::Debug => 3,
        Level::Trace => 4,
    }
}

const fn level_enum(verbosity: i8) -> Level {
    match verbosity {
        i8::MIN..=0 => Level::Error,
        1 => Level::Warn,
        2 => Level::Info,
        3 => Level::Debug,
        _ => Level::Trace,
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log_level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, clap::Parser)]
    struct Cli {
        #[clap(flatten)]
        verbose: Verbosity,
    }

    fn level(args: &[&str]) -> Level {
        use clap::Parser;
        Cli::try_parse_from(std::iter::once("cli").chain(args.iter().copied()))
            .unwrap()
            .verbose
            .log_level()
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags() {
        assert_eq!(level(&[]), Level::Info);
        assert_eq!(level(&["-v"]), Level::Debug);
        assert_eq!(level(&["-vvvv"]), Level::Trace);
        assert_eq!(level(&["-q"]), Level::Warn);
        assert_eq!(level(&["-qqq"]), Level::Error);
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct File {
            verbose: Verbosity,
        }
        let file: File = toml::from_str(r#"verbose = "Warning""#).unwrap();
        assert_eq!(file.verbose.log_level(), Level::Warn);
        let file: File = toml::from_str(r#"verbose = "trace""#).unwrap();
        assert_eq!(file.verbose.log_level(), Level::Trace);
        assert!(toml::from_str::<File>(r#"verbose = "loud""#).is_err());
    }
}
