//! Command line parsing (simple parsing, no external deps).

use std::path::PathBuf;

use crate::error::{CliError, CliResult};

/// Help text printed for `--help`.
pub const USAGE: &str = "\
Usage: hgkit [OPTIONS]

Options:
  -c, --countdown <NAME=SECS>  Start a countdown (repeatable, default: demo=5)
  -p, --period-ms <MS>         Tick period in milliseconds (default: 1000)
      --config <PATH>          Load timer config from a TOML file
  -h, --help                   Show this help";

/// Parsed command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Countdowns to start, in order.
    pub countdowns: Vec<(String, i64)>,
    /// Period override in milliseconds.
    pub period_ms: Option<u64>,
    /// Config file to load before applying overrides.
    pub config: Option<PathBuf>,
    /// Print help and exit.
    pub help: bool,
}

impl Args {
    /// Parses arguments, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns `Usage` for unknown flags, missing values or bad numbers.
    pub fn parse<I>(args: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--countdown" | "-c" => {
                    let value = next_value(&mut args, &arg)?;
                    parsed.countdowns.push(parse_countdown(&value)?);
                }
                "--period-ms" | "-p" => {
                    let value = next_value(&mut args, &arg)?;
                    let period = value
                        .parse()
                        .map_err(|_| CliError::Usage(format!("bad period `{value}`")))?;
                    parsed.period_ms = Some(period);
                }
                "--config" => {
                    parsed.config = Some(PathBuf::from(next_value(&mut args, &arg)?));
                }
                "--help" | "-h" => parsed.help = true,
                other => return Err(CliError::Usage(format!("unknown flag `{other}`"))),
            }
        }

        if parsed.countdowns.is_empty() {
            parsed.countdowns.push(("demo".to_owned(), 5));
        }
        Ok(parsed)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> CliResult<String> {
    args.next()
        .ok_or_else(|| CliError::Usage(format!("`{flag}` needs a value")))
}

fn parse_countdown(value: &str) -> CliResult<(String, i64)> {
    let (name, secs) = value
        .split_once('=')
        .ok_or_else(|| CliError::Usage(format!("expected NAME=SECS, got `{value}`")))?;
    let secs = secs
        .parse()
        .map_err(|_| CliError::Usage(format!("bad seconds in `{value}`")))?;
    Ok((name.to_owned(), secs))
}
