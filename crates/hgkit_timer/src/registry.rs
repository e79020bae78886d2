//! # Shard Timer
//!
//! Many independent countdowns, keyed by string, sharing one tick source.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      SHARD TIMER                         │
//! ├──────────────────────────────────────────────────────────┤
//! │  start / stop ──┐                                        │
//! │                 ▼                                        │
//! │        ┌──────────────────┐     ┌──────────────┐         │
//! │        │ Mutex<State>     │     │ Tick source  │         │
//! │        │ - entries        │◄─┐  │ (one, lazy)  │         │
//! │        │ - tick source    │  │  └──────┬───────┘         │
//! │        └──────────────────┘  │         │ fire            │
//! │                              │         ▼                 │
//! │                              │  ┌──────────────┐         │
//! │                              └──│ Serial queue │         │
//! │                     tick pass   │ (listeners)  │         │
//! │                                 └──────────────┘         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick pass
//!
//! 1. Under the lock: drop the tick if it came from a retired source,
//!    otherwise decrement every entry and snapshot the results.
//! 2. Lock released: notify each listener. Listeners may call back into
//!    the timer.
//! 3. Under the lock: remove entries that reached zero, and release the
//!    tick source if nothing is left.
//!
//! The tick source exists exactly while at least one countdown is
//! registered.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::TimerConfig;
use crate::error::{TimerError, TimerResult};
use crate::listener::CountdownListener;
use crate::queue::{DispatchThread, SerialQueue};
use crate::ticker::{FireFn, ThreadTicker, TickHandle, TickSource};

/// What `start` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new countdown was registered.
    Started,
    /// The identifier was already counting down; nothing changed.
    AlreadyActive,
}

/// Registry counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Tick passes processed.
    pub ticks: u64,
    /// Ticks discarded because their source had been retired.
    pub stale_ticks: u64,
    /// Listener invocations.
    pub notifications: u64,
    /// Countdowns that ran down to zero.
    pub completed: u64,
    /// Countdowns removed by `stop` before reaching zero.
    pub stopped: u64,
    /// Tick sources created.
    pub sources_started: u64,
}

/// One registered countdown.
struct Entry {
    remaining: i64,
    listener: Arc<dyn CountdownListener>,
    /// Registration number, so a stale removal never hits a newer entry.
    epoch: u64,
}

/// The currently installed tick source.
struct ActiveSource {
    generation: u64,
    handle: Box<dyn TickHandle>,
}

/// Snapshot of one entry taken during phase 1 of a tick.
struct Due {
    identifier: String,
    remaining: i64,
    epoch: u64,
    listener: Arc<dyn CountdownListener>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    source: Option<ActiveSource>,
    /// Generation of the most recently created source.
    generation: u64,
    next_epoch: u64,
    stats: TimerStats,
}

struct Inner {
    state: Mutex<State>,
    ticker: Arc<dyn TickSource>,
    queue: Arc<dyn SerialQueue>,
    config: TimerConfig,
}

/// Shared countdown registry.
///
/// Cheap to clone; clones share the same countdowns. The tick source and
/// every pending countdown are released when the last clone is dropped
/// or `shutdown` is called.
#[derive(Clone)]
pub struct ShardTimer {
    inner: Arc<Inner>,
}

impl ShardTimer {
    /// Creates a registry on the given tick source and serial queue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` fails validation.
    pub fn new(
        config: TimerConfig,
        ticker: Arc<dyn TickSource>,
        queue: Arc<dyn SerialQueue>,
    ) -> TimerResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                ticker,
                queue,
                config,
            }),
        })
    }

    /// Creates a registry with its own ticker thread and dispatch thread.
    ///
    /// Listeners run on the dispatch thread, named `<thread_name>-queue`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a bad config, `Spawn` if the dispatch
    /// thread cannot be created.
    pub fn spawn(config: TimerConfig) -> TimerResult<Self> {
        config.validate()?;
        let queue = DispatchThread::spawn(format!("{}-queue", config.thread_name))?;
        let ticker = ThreadTicker::new(config.thread_name.clone());
        Self::new(config, Arc::new(ticker), Arc::new(queue))
    }

    /// Starts a countdown of `duration` seconds under `identifier`.
    ///
    /// If the identifier is already counting down, nothing changes: the
    /// remaining time and the first listener are kept.
    pub fn start<F>(&self, identifier: impl Into<String>, duration: i64, on_tick: F) -> StartOutcome
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.start_listener(identifier, duration, Arc::new(on_tick))
    }

    /// Starts a countdown using the configured default duration.
    pub fn start_default<F>(&self, identifier: impl Into<String>, on_tick: F) -> StartOutcome
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        let duration = self.inner.config.default_duration_secs;
        self.start(identifier, duration, on_tick)
    }

    /// Starts a countdown with a shared listener.
    pub fn start_listener(
        &self,
        identifier: impl Into<String>,
        duration: i64,
        listener: Arc<dyn CountdownListener>,
    ) -> StartOutcome {
        let identifier = identifier.into();
        let mut state = self.inner.state.lock();

        // Present until removed, even at zero during its terminal tick.
        let outcome = if state.entries.contains_key(&identifier) {
            StartOutcome::AlreadyActive
        } else {
            let epoch = state.next_epoch;
            state.next_epoch += 1;
            tracing::debug!("Countdown {} started: {}s", identifier, duration);
            state.entries.insert(
                identifier,
                Entry {
                    remaining: duration,
                    listener,
                    epoch,
                },
            );
            StartOutcome::Started
        };

        self.inner.ensure_source(&mut state);
        outcome
    }

    /// Removes a countdown regardless of its remaining time.
    ///
    /// Unknown identifiers are ignored.
    pub fn stop(&self, identifier: &str) {
        // Ignoring NotFound is the documented contract.
        let _ = self.try_stop(identifier);
    }

    /// Removes a countdown and returns its remaining seconds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no countdown is registered under `identifier`.
    pub fn try_stop(&self, identifier: &str) -> TimerResult<i64> {
        let (removed, released) = {
            let mut state = self.inner.state.lock();
            let removed = state.entries.remove(identifier);
            if removed.is_some() {
                state.stats.stopped += 1;
                tracing::debug!("Countdown {} stopped", identifier);
            }
            (removed, release_if_idle(&mut state))
        };
        // Joins the ticker outside the lock.
        drop(released);

        removed
            .map(|entry| entry.remaining)
            .ok_or_else(|| TimerError::NotFound(identifier.to_owned()))
    }

    /// Clears every countdown and releases the tick source.
    ///
    /// The timer stays usable; a later `start` installs a new source.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Remaining seconds for `identifier`, if registered.
    #[must_use]
    pub fn remaining(&self, identifier: &str) -> Option<i64> {
        self.inner
            .state
            .lock()
            .entries
            .get(identifier)
            .map(|entry| entry.remaining)
    }

    /// True if `identifier` is registered.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.inner.state.lock().entries.contains_key(identifier)
    }

    /// Number of registered countdowns.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// True while a tick source is installed.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.inner.state.lock().source.is_some()
    }

    /// Returns a snapshot of the registry counters.
    #[must_use]
    pub fn stats(&self) -> TimerStats {
        self.inner.state.lock().stats
    }

    /// Returns the configuration this timer was built with.
    #[must_use]
    pub fn config(&self) -> &TimerConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for ShardTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ShardTimer")
            .field("active", &state.entries.len())
            .field("ticking", &state.source.is_some())
            .field("stats", &state.stats)
            .finish()
    }
}

impl Inner {
    /// Installs a tick source if none is running. Caller holds the lock.
    fn ensure_source(self: &Arc<Self>, state: &mut State) {
        if state.source.is_some() || state.entries.is_empty() {
            return;
        }

        let generation = state.generation + 1;
        let weak = Arc::downgrade(self);
        let queue = Arc::clone(&self.queue);
        let on_fire: FireFn = Box::new(move || {
            let weak: Weak<Self> = weak.clone();
            queue.dispatch(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tick(generation);
                }
            }));
        });

        match self
            .ticker
            .schedule(self.config.period(), self.config.fire_immediately, on_fire)
        {
            Ok(handle) => {
                state.generation = generation;
                state.source = Some(ActiveSource { generation, handle });
                state.stats.sources_started += 1;
                tracing::debug!("Tick source {} started", generation);
            }
            Err(e) => {
                // Entries stay registered; the next start retries.
                tracing::error!("Failed to start tick source: {}", e);
            }
        }
    }

    /// One tick pass. Runs on the serial queue.
    fn tick(&self, generation: u64) {
        let batch: Vec<Due> = {
            let mut state = self.state.lock();
            let current = state.source.as_ref().map(|source| source.generation);
            if current != Some(generation) {
                state.stats.stale_ticks += 1;
                tracing::trace!("Dropped tick from retired source {}", generation);
                return;
            }

            state.stats.ticks += 1;
            let batch: Vec<Due> = state
                .entries
                .iter_mut()
                .map(|(identifier, entry)| {
                    entry.remaining -= 1;
                    Due {
                        identifier: identifier.clone(),
                        remaining: entry.remaining,
                        epoch: entry.epoch,
                        listener: Arc::clone(&entry.listener),
                    }
                })
                .collect();
            batch
        };

        tracing::trace!("Tick {}: {} countdowns", generation, batch.len());
        for due in &batch {
            due.listener.on_tick(due.remaining);
        }

        let released = {
            let mut state = self.state.lock();
            state.stats.notifications += batch.len() as u64;
            for due in batch.iter().filter(|due| due.remaining <= 0) {
                let same_entry = state
                    .entries
                    .get(&due.identifier)
                    .is_some_and(|entry| entry.epoch == due.epoch);
                if same_entry {
                    state.entries.remove(&due.identifier);
                    state.stats.completed += 1;
                    tracing::debug!("Countdown {} finished", due.identifier);
                }
            }
            release_if_idle(&mut state)
        };
        drop(released);
    }

    fn shutdown(&self) {
        let (cleared, released) = {
            let mut state = self.state.lock();
            let cleared = std::mem::take(&mut state.entries);
            (cleared, release_if_idle(&mut state))
        };
        if !cleared.is_empty() {
            tracing::debug!("Shard timer shut down with {} countdowns pending", cleared.len());
        }
        // Listeners and the ticker are dropped outside the lock.
        drop(released);
        drop(cleared);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cancels and detaches the tick source if no entries remain.
///
/// The returned handle must be dropped after the lock is released.
fn release_if_idle(state: &mut State) -> Option<Box<dyn TickHandle>> {
    if !state.entries.is_empty() {
        return None;
    }
    state.source.take().map(|mut source| {
        source.handle.cancel();
        tracing::debug!("Tick source {} stopped", source.generation);
        source.handle
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ManualQueue;
    use crate::ticker::ManualTicker;

    struct Rig {
        timer: ShardTimer,
        ticker: Arc<ManualTicker>,
        queue: Arc<ManualQueue>,
    }

    impl Rig {
        fn new(fire_immediately: bool) -> Self {
            let ticker = Arc::new(ManualTicker::new());
            let queue = Arc::new(ManualQueue::new());
            let config = TimerConfig {
                fire_immediately,
                ..TimerConfig::default()
            };
            let timer = ShardTimer::new(config, ticker.clone(), queue.clone()).unwrap();
            Self { timer, ticker, queue }
        }

        fn tick(&self) {
            self.ticker.fire();
            self.queue.drain();
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<i64>>>, impl Fn(i64) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        (seen, move |remaining: i64| inner.lock().push(remaining))
    }

    #[test]
    fn test_source_is_lazy() {
        let rig = Rig::new(false);
        assert!(!rig.timer.is_ticking());
        assert_eq!(rig.ticker.scheduled(), 0);

        let (_, cb) = recorder();
        assert_eq!(rig.timer.start("x", 5, cb), StartOutcome::Started);
        assert!(rig.timer.is_ticking());
        assert_eq!(rig.ticker.active(), 1);
    }

    #[test]
    fn test_immediate_first_tick() {
        let rig = Rig::new(true);
        let (seen, cb) = recorder();
        rig.timer.start("x", 5, cb);

        assert_eq!(rig.queue.pending(), 1);
        rig.queue.drain();
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn test_stop_releases_source() {
        let rig = Rig::new(false);
        let (_, cb) = recorder();
        rig.timer.start("x", 5, cb);
        rig.timer.stop("x");

        assert!(!rig.timer.is_ticking());
        assert_eq!(rig.ticker.active(), 0);
        assert_eq!(rig.timer.stats().stopped, 1);
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let rig = Rig::new(false);
        let (seen, cb) = recorder();
        rig.timer.start("old", 5, cb);

        // Fire, then retire the source before the queued tick runs.
        rig.ticker.fire();
        rig.timer.stop("old");
        let (seen_new, cb_new) = recorder();
        rig.timer.start("new", 5, cb_new);
        rig.queue.drain();

        assert!(seen.lock().is_empty());
        assert!(seen_new.lock().is_empty());
        assert_eq!(rig.timer.remaining("new"), Some(5));
        assert_eq!(rig.timer.stats().stale_ticks, 1);
    }

    #[test]
    fn test_try_stop_reports_remaining_and_not_found() {
        let rig = Rig::new(false);
        let (_, cb) = recorder();
        rig.timer.start("x", 5, cb);
        rig.tick();

        assert_eq!(rig.timer.try_stop("x").unwrap(), 4);
        assert!(matches!(rig.timer.try_stop("x"), Err(TimerError::NotFound(id)) if id == "x"));
    }

    #[test]
    fn test_start_from_terminal_callback_is_ignored() {
        let rig = Rig::new(false);
        let timer = rig.timer.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let inner_seen = Arc::clone(&seen);
        let inner_outcomes = Arc::clone(&outcomes);

        rig.timer.start("loop", 1, move |remaining: i64| {
            inner_seen.lock().push(remaining);
            if remaining == 0 {
                let (_, cb) = recorder();
                inner_outcomes.lock().push(timer.start("loop", 3, cb));
            }
        });

        rig.tick();
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(*outcomes.lock(), vec![StartOutcome::AlreadyActive]);
        assert!(!rig.timer.contains("loop"));
        assert!(!rig.timer.is_ticking());
        assert_eq!(rig.timer.stats().completed, 1);

        // Removed for good: nothing fires on later ticks.
        rig.tick();
        assert_eq!(*seen.lock(), vec![0]);
    }

    #[test]
    fn test_zero_duration_entry_is_not_replaced() {
        let rig = Rig::new(false);
        let (first, cb_first) = recorder();
        let (second, cb_second) = recorder();

        assert_eq!(rig.timer.start("x", 0, cb_first), StartOutcome::Started);
        assert_eq!(rig.timer.start("x", 5, cb_second), StartOutcome::AlreadyActive);
        assert_eq!(rig.timer.remaining("x"), Some(0));

        rig.tick();
        assert_eq!(*first.lock(), vec![-1]);
        assert!(second.lock().is_empty());
        assert!(!rig.timer.contains("x"));
        assert!(!rig.timer.is_ticking());
    }

    #[test]
    fn test_shutdown_clears_everything() {
        let rig = Rig::new(false);
        let (seen, cb) = recorder();
        rig.timer.start("a", 5, cb);
        let (_, cb) = recorder();
        rig.timer.start("b", 5, cb);

        rig.timer.shutdown();
        assert_eq!(rig.timer.active_count(), 0);
        assert!(!rig.timer.is_ticking());

        rig.tick();
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_drop_releases_source() {
        let rig = Rig::new(false);
        let (_, cb) = recorder();
        rig.timer.start("x", 5, cb);
        let Rig { timer, ticker, .. } = rig;

        drop(timer);
        assert_eq!(ticker.active(), 0);
    }

    #[test]
    fn test_start_default_uses_config() {
        let rig = Rig::new(false);
        let (_, cb) = recorder();
        rig.timer.start_default("sms", cb);
        assert_eq!(rig.timer.remaining("sms"), Some(60));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TimerConfig {
            period_ms: 0,
            ..TimerConfig::default()
        };
        let result = ShardTimer::new(
            config,
            Arc::new(ManualTicker::new()),
            Arc::new(ManualQueue::new()),
        );
        assert!(matches!(result, Err(TimerError::InvalidConfig(_))));
    }
}
