//! Task scheduling primitives
//!
//! The background [`TaskQueue`] and [`WorkerPool`], and the per-context
//! [`ForegroundQueues`] registry. The [`DefaultPlatform`](crate::platform::DefaultPlatform)
//! ties them together.

pub mod foreground;
pub mod queue;
pub mod task;
pub mod worker;

pub use foreground::{ContextQueues, DelayedTaskQueue, DrainedTasks, ForegroundQueues};
pub use queue::TaskQueue;
pub use task::{BoxedTask, ContextId, ExpectedRuntime, IdleTask, PostedTask, Task};
pub use worker::{PoolStats, WorkerOptions, WorkerPool, WorkerThread};

use std::thread;
use std::time::Instant;

use once_cell::sync::Lazy;

/// Upper bound on the number of background worker threads.
pub const MAX_THREAD_POOL_SIZE: usize = 8;

static PROCESS_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Hardware parallelism reported by the OS, or 1 if unknown.
pub fn hardware_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Resolve a requested pool size into the size actually used.
///
/// A request of zero or less means "auto": one less than the hardware
/// parallelism. The result is always in `1..=MAX_THREAD_POOL_SIZE`.
pub fn resolve_thread_pool_size(
    requested: i32,
    hardware_parallelism: usize,
) -> usize {
    let wanted = if requested < 1 {
        hardware_parallelism.saturating_sub(1)
    } else {
        requested as usize
    };
    wanted.clamp(1, MAX_THREAD_POOL_SIZE)
}

/// Seconds elapsed on a process-wide monotonic clock.
pub fn monotonic_seconds() -> f64 {
    PROCESS_EPOCH.elapsed().as_secs_f64()
}
