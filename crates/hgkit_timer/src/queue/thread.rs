//! Dedicated dispatch thread.

use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;

use super::{Job, SerialQueue};
use crate::error::{TimerError, TimerResult};

/// A serial queue backed by one named consumer thread.
///
/// Jobs run in submission order. Shutting down (or dropping) the queue
/// closes the channel, lets the thread finish the jobs already queued,
/// then joins it.
pub struct DispatchThread {
    /// Sending half; `None` once shut down.
    tx: Mutex<Option<Sender<Job>>>,
    /// Consumer thread handle; `None` once joined.
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Identity of the consumer thread.
    thread_id: ThreadId,
    /// Thread name, for logs.
    name: String,
}

impl DispatchThread {
    /// Spawns the consumer thread.
    ///
    /// # Errors
    ///
    /// Returns `Spawn` if the OS refuses to create the thread.
    pub fn spawn(name: impl Into<String>) -> TimerResult<Self> {
        let name = name.into();
        let (tx, rx) = unbounded::<Job>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .map_err(|source| TimerError::Spawn {
                name: name.clone(),
                source,
            })?;

        tracing::debug!("Dispatch thread {} started", name);

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
            name,
        })
    }

    /// True when called from the consumer thread itself.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Runs `job` inline when already on the consumer thread, otherwise
    /// dispatches it.
    pub fn run_or_dispatch(&self, job: Job) {
        if self.is_current() {
            job();
        } else {
            self.dispatch(job);
        }
    }

    /// True until `shutdown` has been called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Stops accepting jobs, drains what is queued and joins the thread.
    ///
    /// Called from the consumer thread itself, the thread is detached
    /// instead of joined.
    pub fn shutdown(&self) {
        drop(self.tx.lock().take());

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if self.is_current() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Dispatch thread {} panicked", self.name);
            } else {
                tracing::debug!("Dispatch thread {} stopped", self.name);
            }
        }
    }
}

impl SerialQueue for DispatchThread {
    fn dispatch(&self, job: Job) {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(job).is_err() {
                    tracing::warn!("Dispatch thread {} is gone, job dropped", self.name);
                }
            }
            None => tracing::warn!("Dispatch thread {} is shut down, job dropped", self.name),
        }
    }
}

impl Drop for DispatchThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DispatchThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchThread")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_jobs_run_in_order_on_one_thread() {
        let queue = DispatchThread::spawn("test-dispatch").unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        for i in 0..100 {
            let tx = tx.clone();
            queue.dispatch(Box::new(move || {
                tx.send((i, thread::current().id())).unwrap();
            }));
        }

        let results: Vec<_> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        let ids: Vec<_> = results.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, (0..100).collect::<Vec<_>>());
        assert!(results.iter().all(|(_, id)| *id == results[0].1));
        assert_ne!(results[0].1, thread::current().id());
    }

    #[test]
    fn test_run_or_dispatch_inline_on_queue_thread() {
        let queue = Arc::new(DispatchThread::spawn("test-inline").unwrap());
        let (tx, rx) = crossbeam_channel::unbounded();

        let inner = Arc::clone(&queue);
        queue.dispatch(Box::new(move || {
            let (inline_tx, inline_rx) = crossbeam_channel::bounded(1);
            inner.run_or_dispatch(Box::new(move || inline_tx.send(()).unwrap()));
            // Inline means the job already ran before we got here.
            tx.send(inline_rx.try_recv().is_ok()).unwrap();
        }));

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(!queue.is_current());
    }

    #[test]
    fn test_shutdown_drains_queued_jobs() {
        let queue = DispatchThread::spawn("test-drain").unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        for i in 0..10 {
            let tx = tx.clone();
            queue.dispatch(Box::new(move || {
                thread::sleep(Duration::from_millis(1));
                tx.send(i).unwrap();
            }));
        }
        queue.shutdown();
        assert!(!queue.is_running());

        let drained: Vec<i32> = rx.try_iter().collect();
        assert_eq!(drained.len(), 10);

        // Jobs after shutdown are dropped, not run.
        let tx_late = tx.clone();
        queue.dispatch(Box::new(move || tx_late.send(99).unwrap()));
        assert!(rx.try_recv().is_err());
    }
}
