//! Tick source backed by a tokio interval task.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{FireFn, TickHandle, TickSource};
use crate::error::TimerResult;

/// Spawns one interval task per scheduled source on a tokio runtime.
///
/// Missed ticks are skipped, matching `ThreadTicker`.
#[derive(Clone, Debug)]
pub struct TokioTicker {
    runtime: Handle,
}

impl TokioTicker {
    /// Creates a ticker that spawns onto `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Creates a ticker for the runtime this is called from.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TickSource for TokioTicker {
    fn schedule(
        &self,
        period: Duration,
        fire_immediately: bool,
        on_fire: FireFn,
    ) -> TimerResult<Box<dyn TickHandle>> {
        let task = self.runtime.spawn(async move {
            let first = if fire_immediately {
                Instant::now()
            } else {
                Instant::now() + period
            };
            let mut interval = interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                on_fire();
            }
        });

        tracing::debug!("Tokio ticker task started ({:?} period)", period);
        Ok(Box::new(TokioTickHandle { task }))
    }
}

struct TokioTickHandle {
    task: JoinHandle<()>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
