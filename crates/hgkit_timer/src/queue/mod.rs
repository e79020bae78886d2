//! # Serial Queues
//!
//! The execution context every tick pass runs on. A serial queue runs
//! jobs one at a time in submission order, so listeners never run
//! concurrently with each other.
//!
//! ```text
//!   Ticker thread ──dispatch──> [ Job channel ] ──> Queue thread
//!                                                   (tick pass, listeners)
//! ```
//!
//! - `DispatchThread`: a dedicated consumer thread (the "main queue").
//! - `ManualQueue`: jobs pile up until the host event loop calls `drain`.

mod manual;
mod thread;

pub use manual::ManualQueue;
pub use thread::DispatchThread;

/// A unit of work submitted to a serial queue.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A serial execution context.
pub trait SerialQueue: Send + Sync {
    /// Enqueues a job. Must not block and must not run the job inline.
    fn dispatch(&self, job: Job);
}
