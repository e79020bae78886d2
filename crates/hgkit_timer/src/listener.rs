//! # Countdown Listeners
//!
//! A listener receives the post-decrement remaining value of one countdown,
//! once per tick, on the registry's serial queue.
//!
//! Closures work directly:
//!
//! ```rust,ignore
//! timer.start("promo", 3, |remaining: i64| println!("{remaining}s left"));
//! ```
//!
//! Callers that prefer polling use a `ChannelListener` and drain the
//! receiving side themselves.

use crossbeam_channel::{Receiver, Sender};

/// Receives tick notifications for one countdown.
pub trait CountdownListener: Send + Sync {
    /// Called with the remaining seconds after this tick's decrement.
    fn on_tick(&self, remaining: i64);
}

impl<F> CountdownListener for F
where
    F: Fn(i64) + Send + Sync,
{
    #[inline]
    fn on_tick(&self, remaining: i64) {
        self(remaining);
    }
}

/// One tick of one countdown, as delivered by `ChannelListener`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickEvent {
    /// Countdown identifier.
    pub identifier: String,
    /// Remaining seconds after the decrement.
    pub remaining: i64,
}

impl TickEvent {
    /// True if this was the last tick of the countdown.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.remaining <= 0
    }
}

/// Forwards ticks into a crossbeam channel.
///
/// Several countdowns may share one channel; the identifier tells them
/// apart. Sends to a disconnected receiver are dropped.
#[derive(Clone, Debug)]
pub struct ChannelListener {
    identifier: String,
    tx: Sender<TickEvent>,
}

impl ChannelListener {
    /// Creates a listener that tags its events with `identifier`.
    #[must_use]
    pub fn new(identifier: impl Into<String>, tx: Sender<TickEvent>) -> Self {
        Self {
            identifier: identifier.into(),
            tx,
        }
    }

    /// Creates a listener together with a fresh unbounded receiver.
    #[must_use]
    pub fn with_channel(identifier: impl Into<String>) -> (Self, Receiver<TickEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(identifier, tx), rx)
    }
}

impl CountdownListener for ChannelListener {
    fn on_tick(&self, remaining: i64) {
        let event = TickEvent {
            identifier: self.identifier.clone(),
            remaining,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!("Tick receiver for {} is gone", self.identifier);
        }
    }
}
