//! Test-driven tick source.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{FireFn, TickHandle, TickSource};
use crate::error::TimerResult;

/// One scheduled source.
struct Slot {
    on_fire: Arc<FireFn>,
    cancelled: Arc<AtomicBool>,
}

/// Tick source that only fires when `fire` is called.
///
/// The period is ignored; each `fire` call is one period.
#[derive(Default)]
pub struct ManualTicker {
    slots: Mutex<Vec<Slot>>,
    scheduled: AtomicU64,
}

impl ManualTicker {
    /// Creates a ticker with no scheduled sources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every live source once. Returns how many fired.
    pub fn fire(&self) -> usize {
        let live: Vec<Arc<FireFn>> = {
            let mut slots = self.slots.lock();
            slots.retain(|slot| !slot.cancelled.load(Ordering::Acquire));
            let live: Vec<_> = slots.iter().map(|slot| Arc::clone(&slot.on_fire)).collect();
            live
        };
        for on_fire in &live {
            on_fire();
        }
        live.len()
    }

    /// Number of sources not yet cancelled.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| !slot.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Number of sources ever scheduled.
    #[must_use]
    pub fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }
}

impl TickSource for ManualTicker {
    fn schedule(
        &self,
        _period: Duration,
        fire_immediately: bool,
        on_fire: FireFn,
    ) -> TimerResult<Box<dyn TickHandle>> {
        let on_fire = Arc::new(on_fire);
        let cancelled = Arc::new(AtomicBool::new(false));

        self.slots.lock().push(Slot {
            on_fire: Arc::clone(&on_fire),
            cancelled: Arc::clone(&cancelled),
        });
        self.scheduled.fetch_add(1, Ordering::Relaxed);

        if fire_immediately {
            on_fire();
        }

        Ok(Box::new(ManualTickHandle { cancelled }))
    }
}

impl std::fmt::Debug for ManualTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTicker")
            .field("active", &self.active())
            .field("scheduled", &self.scheduled())
            .finish()
    }
}

struct ManualTickHandle {
    cancelled: Arc<AtomicBool>,
}

impl TickHandle for ManualTickHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Drop for ManualTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_only_on_demand() {
        let ticker = ManualTicker::new();
        let count = Arc::new(AtomicU64::new(0));
        let inner = Arc::clone(&count);

        let handle = ticker
            .schedule(
                Duration::from_secs(1),
                false,
                Box::new(move || {
                    inner.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(ticker.fire(), 1);
        assert_eq!(ticker.fire(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(handle);
        assert_eq!(ticker.active(), 0);
        assert_eq!(ticker.fire(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(ticker.scheduled(), 1);
    }

    #[test]
    fn test_immediate_fire_happens_in_schedule() {
        let ticker = ManualTicker::new();
        let count = Arc::new(AtomicU64::new(0));
        let inner = Arc::clone(&count);

        let _handle = ticker
            .schedule(
                Duration::from_secs(1),
                true,
                Box::new(move || {
                    inner.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
