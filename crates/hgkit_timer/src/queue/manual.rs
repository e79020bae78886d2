//! Host-pumped queue.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{Job, SerialQueue};

/// Queue whose jobs only run when the owner calls `drain` or `run_next`.
///
/// Meant for hosts with their own event loop, and for deterministic tests.
#[derive(Default)]
pub struct ManualQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Runs the oldest pending job. Returns false if there was none.
    pub fn run_next(&self) -> bool {
        // Pop before running so the job may dispatch more work.
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs pending jobs until the queue is empty, including jobs
    /// dispatched while draining. Returns the number of jobs run.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl SerialQueue for ManualQueue {
    fn dispatch(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl std::fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
