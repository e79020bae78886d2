//! # CLI Error Types

use hgkit_timer::TimerError;
use thiserror::Error;

/// Errors that end the demo.
#[derive(Error, Debug)]
pub enum CliError {
    /// A flag was missing its value or could not be parsed.
    #[error("usage: {0}")]
    Usage(String),

    /// The timer could not be configured or started.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Result type for the demo.
pub type CliResult<T> = Result<T, CliError>;
