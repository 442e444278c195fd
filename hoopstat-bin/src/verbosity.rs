//! `-v`/`-q` flags that pick the log level.
//!
//! Without flags only warnings and errors are shown.
//! - `-q` errors only
//! - `-v` info
//! - `-vv` debug
//! - `-vvv` trace

use log::{Level, LevelFilter};
use serde::Deserialize;

#[derive(clap::Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// Pass many times for more log output
    ///
    /// By default, only warnings and errors are reported. Passing `-v` one
    /// time also prints info messages, `-vv` enables debug logging and
    /// `-vvv` trace.
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    verbose: u8,

    /// Only report errors
    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "verbose"
    )]
    quiet: u8,
}

impl Verbosity {
    /// Get the log level
    pub(crate) const fn log_level(self) -> Level {
        level_enum(self.verbosity())
    }

    /// Get the log level filter
    pub(crate) fn log_level_filter(self) -> LevelFilter {
        self.log_level().to_level_filter()
    }

    /// Returns `true` if no flag was passed
    pub(crate) const fn is_default(self) -> bool {
        self.verbose == 0 && self.quiet == 0
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn verbosity(self) -> i8 {
        level_value(Level::Warn) - (self.quiet as i8) + (self.verbose as i8)
    }
}

// A config file sets the level by name, e.g. `verbose = "debug"`
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
        let offset = level_value(level) - level_value(Level::Warn);
        Ok(if offset < 0 {
            Verbosity {
                verbose: 0,
                quiet: offset.unsigned_abs(),
            }
        } else {
            Verbosity {
                verbose: offset as u8,
                quiet: 0,
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        verbose: Verbosity,
    }

    #[rstest]
    #[case(&[], Level::Warn)]
    #[case(&["-q"], Level::Error)]
    #[case(&["-qq"], Level::Error)]
    #[case(&["-v"], Level::Info)]
    #[case(&["-vv"], Level::Debug)]
    #[case(&["-vvvv"], Level::Trace)]
    fn test_flags(#[case] flags: &[&str], #[case] expected: Level) {
        let args = std::iter::once("hoopstat").chain(flags.iter().copied());
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose.log_level(), expected);
    }

    #[rstest]
    #[case("error", Level::Error)]
    #[case("Warning", Level::Warn)]
    #[case("info", Level::Info)]
    #[case("DEBUG", Level::Debug)]
    fn test_deserialize(#[case] name: &str, #[case] expected: Level) {
        let verbosity: Verbosity = serde_json::from_str(&format!("\"{name}\"")).unwrap();
        assert_eq!(verbosity.log_level(), expected);
    }

    #[test]
    fn test_deserialize_rejects_unknown_level() {
        assert!(serde_json::from_str::<Verbosity>("\"loud\"").is_err());
    }
}
