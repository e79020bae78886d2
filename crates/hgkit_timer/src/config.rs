//! # Timer Configuration
//!
//! Loaded once at startup, either from code (`TimerConfig::default()`) or
//! from a TOML file:
//!
//! ```toml
//! period_ms = 1000
//! fire_immediately = true
//! default_duration_secs = 60
//! thread_name = "hgkit-ticker"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{TimerError, TimerResult};
use crate::{DEFAULT_DURATION_SECS, TICK_PERIOD_MS};

/// Registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    /// Fire the first tick as soon as the tick source starts.
    pub fire_immediately: bool,
    /// Duration used by `ShardTimer::start_default`.
    pub default_duration_secs: i64,
    /// Name given to the ticker thread.
    pub thread_name: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period_ms: TICK_PERIOD_MS,
            fire_immediately: true,
            default_duration_secs: DEFAULT_DURATION_SECS,
            thread_name: "hgkit-ticker".to_owned(),
        }
    }
}

impl TimerConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or a zero period.
    pub fn from_toml_str(text: &str) -> TimerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TimerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidConfig` otherwise.
    pub fn load(path: impl AsRef<Path>) -> TimerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded timer config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Checks the values a tick source cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero period or an empty thread name.
    pub fn validate(&self) -> TimerResult<()> {
        if self.period_ms == 0 {
            return Err(TimerError::InvalidConfig("period_ms must be > 0".into()));
        }
        if self.thread_name.is_empty() {
            return Err(TimerError::InvalidConfig("thread_name must not be empty".into()));
        }
        Ok(())
    }

    /// Tick period as a `Duration`.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}
