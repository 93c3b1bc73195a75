//! Worker threads for background tasks.
//!
//! Each worker loops on the shared [`TaskQueue`] until it is terminated.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

use super::queue::TaskQueue;
use crate::platform::PlatformError;

/// Options for spawning worker threads.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Thread name prefix; the worker index is appended.
    pub thread_name_prefix: String,
    /// Stack size for each worker, or the std default.
    pub stack_size: Option<usize>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            thread_name_prefix: "yx-platform-worker".to_string(),
            stack_size: None,
        }
    }
}

/// Pool statistics.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Tasks that ran to completion.
    pub tasks_completed: AtomicUsize,
    /// Tasks that panicked.
    pub tasks_panicked: AtomicUsize,
}

impl PoolStats {
    /// Record a completed task.
    #[inline]
    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a panicked task.
    #[inline]
    pub fn record_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::SeqCst);
    }

    /// Completed task count.
    #[inline]
    pub fn completed(&self) -> usize {
        self.tasks_completed.load(Ordering::SeqCst)
    }

    /// Panicked task count.
    #[inline]
    pub fn panicked(&self) -> usize {
        self.tasks_panicked.load(Ordering::SeqCst)
    }
}

/// A single worker thread.
#[derive(Debug)]
pub struct WorkerThread {
    index: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn a worker pulling from `queue`.
    pub fn spawn(
        index: usize,
        queue: Arc<TaskQueue>,
        stats: Arc<PoolStats>,
        options: &WorkerOptions,
    ) -> Result<Self, PlatformError> {
        let mut builder =
            thread::Builder::new().name(format!("{}-{}", options.thread_name_prefix, index));
        if let Some(stack_size) = options.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || Self::worker_loop(index, &queue, &stats))
            .map_err(|source| PlatformError::WorkerSpawn { index, source })?;

        Ok(Self {
            index,
            handle: Some(handle),
        })
    }

    /// Worker thread main loop.
    fn worker_loop(
        index: usize,
        queue: &TaskQueue,
        stats: &PoolStats,
    ) {
        debug!(worker = index, "worker started");
        while let Some(task) = queue.get_next() {
            match catch_unwind(AssertUnwindSafe(move || task.run())) {
                Ok(()) => stats.record_completed(),
                Err(payload) => {
                    stats.record_panicked();
                    error!(
                        worker = index,
                        message = panic_message(&*payload),
                        "background task panicked"
                    );
                }
            }
        }
        debug!(worker = index, "worker stopped");
    }

    /// Wait for the thread to exit. The queue must already be terminated.
    ///
    /// Called from the worker itself, the thread is detached instead: it
    /// exits on its own once the current task returns.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                debug!(worker = self.index, "detaching current worker");
                return;
            }
            if handle.join().is_err() {
                error!(worker = self.index, "worker thread panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Fixed-size set of worker threads sharing one queue.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<WorkerThread>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Spawn `size` workers on `queue`.
    ///
    /// If any spawn fails, the workers already started are stopped before the
    /// error is returned.
    pub fn spawn(
        size: usize,
        queue: &Arc<TaskQueue>,
        options: &WorkerOptions,
    ) -> Result<Self, PlatformError> {
        let stats = Arc::new(PoolStats::default());
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            match WorkerThread::spawn(index, queue.clone(), stats.clone(), options) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    queue.terminate();
                    for worker in &mut workers {
                        worker.join();
                    }
                    return Err(err);
                }
            }
        }

        debug!(size, "worker pool started");
        Ok(Self { workers, stats })
    }

    /// Get the number of workers.
    #[inline]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Get statistics.
    #[inline]
    pub fn stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }

    /// Join every worker. The queue must already be terminated.
    pub fn join_all(&mut self) {
        for worker in &mut self.workers {
            worker.join();
        }
        debug!(size = self.workers.len(), "worker pool stopped");
    }
}
