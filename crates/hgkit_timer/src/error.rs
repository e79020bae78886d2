//! # Timer Error Types
//!
//! `start` and `stop` never fail; these errors come from the stricter
//! variants, config loading and OS thread creation.

use thiserror::Error;

/// Errors that can occur in the timer system.
#[derive(Error, Debug)]
pub enum TimerError {
    /// No countdown is registered under this identifier.
    #[error("countdown not found: {0}")]
    NotFound(String),

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a configuration file failed.
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        /// Name of the thread that could not be spawned.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for timer operations.
pub type TimerResult<T> = Result<T, TimerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_names_thread() {
        let err = TimerError::Spawn {
            name: "hgkit-ticker".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads"),
        };
        let message = err.to_string();
        assert!(message.contains("`hgkit-ticker`"));
        assert!(message.contains("no threads"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
