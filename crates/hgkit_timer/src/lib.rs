//! # HGKit Timer - The Shared Countdown Registry
//!
//! Many independent, string-keyed countdowns backed by a single periodic
//! tick source.
//!
//! ## Architecture
//!
//! - **Registry**: `ShardTimer` owns identifier → remaining seconds
//! - **Tick sources**: `ThreadTicker`, `ManualTicker`, `TokioTicker` (feature `tokio`)
//! - **Serial queues**: `DispatchThread`, `ManualQueue`
//! - **Listeners**: closures or `ChannelListener`
//!
//! ## Guarantees
//!
//! - At most one tick source per registry, running only while a
//!   countdown is registered
//! - Every tick decrements every countdown by exactly one
//! - Listeners run on one serial queue, never concurrently
//! - A countdown is removed only after its listener has seen the final value
//!
//! ## Example
//!
//! ```rust,ignore
//! use hgkit_timer::{ShardTimer, TimerConfig};
//!
//! let timer = ShardTimer::spawn(TimerConfig::default())?;
//!
//! timer.start("sms-code", 60, |remaining| {
//!     println!("resend in {remaining}s");
//! });
//!
//! // User left the screen.
//! timer.stop("sms-code");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod listener;
pub mod queue;
pub mod registry;
pub mod ticker;

pub use config::TimerConfig;
pub use error::{TimerError, TimerResult};
pub use listener::{ChannelListener, CountdownListener, TickEvent};
pub use queue::{DispatchThread, Job, ManualQueue, SerialQueue};
pub use registry::{ShardTimer, StartOutcome, TimerStats};
pub use ticker::{FireFn, ManualTicker, ThreadTicker, TickHandle, TickSource, TickStats};
#[cfg(feature = "tokio")]
pub use ticker::TokioTicker;

/// Tick period in milliseconds.
///
/// Countdowns are expressed in seconds, so one tick is one second.
pub const TICK_PERIOD_MS: u64 = 1000;

/// Countdown length used when the caller does not pick one.
pub const DEFAULT_DURATION_SECS: i64 = 60;
