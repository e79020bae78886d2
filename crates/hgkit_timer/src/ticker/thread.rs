//! # Thread Ticker
//!
//! Fixed-period tick source running on a dedicated OS thread.
//!
//! ## Design
//!
//! - Deadlines are `start + n * period`, so sleep overshoot does not
//!   accumulate into drift.
//! - Sleeping happens in `recv_timeout` on a cancellation channel, so
//!   `cancel` wakes the thread immediately.
//! - If the thread falls a whole period behind, missed fires are skipped
//!   rather than delivered in a burst.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use super::{FireFn, TickHandle, TickSource};
use crate::error::{TimerError, TimerResult};

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Total fires delivered.
    pub total_ticks: u64,
    /// Fires that started more than a tenth of a period past their deadline.
    pub late_ticks: u64,
    /// Fires dropped because the thread fell a whole period behind.
    pub skipped_ticks: u64,
    /// Worst observed lateness.
    pub max_late_us: u64,
    /// Number of sources scheduled.
    pub sources_started: u64,
}

impl TickStats {
    fn record(&mut self, lateness: Duration, period: Duration) {
        let late_us = u64::try_from(lateness.as_micros()).unwrap_or(u64::MAX);
        self.total_ticks += 1;
        self.max_late_us = self.max_late_us.max(late_us);
        if lateness > period / 10 {
            self.late_ticks += 1;
        }
    }
}

/// Spawns one named thread per scheduled source.
#[derive(Clone, Debug)]
pub struct ThreadTicker {
    /// Name given to each ticker thread.
    thread_name: String,
    /// Statistics shared by every source this ticker scheduled.
    stats: Arc<Mutex<TickStats>>,
}

impl ThreadTicker {
    /// Creates a ticker whose threads carry `thread_name`.
    #[must_use]
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            stats: Arc::new(Mutex::new(TickStats::default())),
        }
    }

    /// Returns a snapshot of the timing statistics.
    #[must_use]
    pub fn stats(&self) -> TickStats {
        *self.stats.lock()
    }

    /// Resets statistics.
    pub fn reset_stats(&self) {
        *self.stats.lock() = TickStats::default();
    }
}

impl Default for ThreadTicker {
    fn default() -> Self {
        Self::new("hgkit-ticker")
    }
}

impl TickSource for ThreadTicker {
    fn schedule(
        &self,
        period: Duration,
        fire_immediately: bool,
        on_fire: FireFn,
    ) -> TimerResult<Box<dyn TickHandle>> {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let stats = Arc::clone(&self.stats);

        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_ticks(period, fire_immediately, &on_fire, &cancel_rx, &stats))
            .map_err(|source| TimerError::Spawn {
                name: self.thread_name.clone(),
                source,
            })?;

        self.stats.lock().sources_started += 1;
        tracing::debug!("Ticker thread {} started ({:?} period)", self.thread_name, period);

        Ok(Box::new(ThreadTickHandle {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        }))
    }
}

fn run_ticks(
    period: Duration,
    fire_immediately: bool,
    on_fire: &FireFn,
    cancel_rx: &Receiver<()>,
    stats: &Mutex<TickStats>,
) {
    let start = Instant::now();
    let mut deadline = if fire_immediately { start } else { start + period };

    loop {
        let now = Instant::now();
        if deadline > now {
            match cancel_rx.recv_timeout(deadline - now) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        } else if !matches!(cancel_rx.try_recv(), Err(TryRecvError::Empty)) {
            return;
        }

        let lateness = Instant::now().saturating_duration_since(deadline);
        stats.lock().record(lateness, period);
        on_fire();

        deadline += period;
        let now = Instant::now();
        while deadline + period <= now {
            deadline += period;
            stats.lock().skipped_ticks += 1;
        }
    }
}

/// Handle for a source running on its own thread.
struct ThreadTickHandle {
    /// Dropping the sender wakes and stops the thread.
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TickHandle for ThreadTickHandle {
    fn cancel(&mut self) {
        drop(self.cancel_tx.take());
    }
}

impl Drop for ThreadTickHandle {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Ticker thread panicked");
            }
        }
    }
}
