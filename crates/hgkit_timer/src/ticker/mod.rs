//! # Tick Sources
//!
//! A tick source calls a fire function once per period until cancelled.
//! The fire function only enqueues work; the tick pass itself runs on the
//! registry's serial queue.
//!
//! ## Contract
//!
//! - `schedule` returns quickly. It may invoke `on_fire` itself for an
//!   immediate first fire, so `on_fire` must only enqueue work.
//! - `TickHandle::cancel` never blocks.
//! - Dropping a handle cancels it and releases its resources (joining
//!   a worker thread where there is one).

mod manual;
mod thread;
#[cfg(feature = "tokio")]
mod interval;

pub use manual::ManualTicker;
pub use thread::{ThreadTicker, TickStats};
#[cfg(feature = "tokio")]
pub use interval::TokioTicker;

use std::time::Duration;

use crate::error::TimerResult;

/// Function called on every fire.
pub type FireFn = Box<dyn Fn() + Send + Sync + 'static>;

/// Something that can deliver periodic fires.
pub trait TickSource: Send + Sync {
    /// Starts a new periodic source.
    ///
    /// With `fire_immediately` the first fire happens right away,
    /// otherwise after one `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing resource cannot be created.
    fn schedule(
        &self,
        period: Duration,
        fire_immediately: bool,
        on_fire: FireFn,
    ) -> TimerResult<Box<dyn TickHandle>>;
}

/// Owner handle of one scheduled source.
pub trait TickHandle: Send {
    /// Stops further fires. A fire already running may still complete.
    fn cancel(&mut self);
}
