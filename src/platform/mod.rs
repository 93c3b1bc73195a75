//! Default platform
//!
//! [`DefaultPlatform`] owns the background worker pool, every context's
//! foreground and delayed queues, and the optional tracing controller.
//!
//! # Locking
//!
//! One mutex guards the pool-size field, the pool handle, the context
//! registry and the tracing controller. It is never held while a task runs:
//! tasks may post further tasks. The background [`TaskQueue`] has its own
//! lock so workers never contend with foreground operations.
//!
//! Tracing controller calls are made with the lock held, so a controller
//! must not call back into the platform. Tasks may emit trace events freely.
//!
//! # Usage
//!
//! ```rust
//! use yaoxiang_platform::{ContextId, DefaultPlatform};
//!
//! let platform = DefaultPlatform::new();
//! platform.set_thread_pool_size(2);
//! platform.ensure_initialized().unwrap();
//!
//! let context = ContextId::next();
//! platform.call_on_foreground_thread(context, || println!("on the owner thread"));
//! assert!(platform.pump_message_loop(context));
//! assert!(!platform.pump_message_loop(context));
//! ```

pub mod error;

pub use error::{PlatformError, PlatformResult};

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::runtime::scheduler::{
    hardware_parallelism, monotonic_seconds, resolve_thread_pool_size, BoxedTask, ContextId,
    ExpectedRuntime, ForegroundQueues, IdleTask, PoolStats, PostedTask, Task, TaskQueue,
    WorkerOptions, WorkerPool,
};
use crate::trace::{CategoryGroupFlag, TraceEvent, TracingController, PLACEHOLDER_CATEGORY_NAME};
use crate::util::config::PlatformConfig;

/// Longest delay honoured; larger delays are clamped to it.
const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + delay`, or the furthest reachable instant when that overflows.
fn deadline_after(
    now: Instant,
    mut delay: Duration,
) -> Instant {
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}

/// Counts of tasks disposed unrun during teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Background tasks no worker picked up.
    pub background: usize,
    /// Foreground tasks across all contexts.
    pub foreground: usize,
    /// Delayed tasks across all contexts.
    pub delayed: usize,
}

impl TeardownReport {
    /// Total disposed tasks.
    #[inline]
    pub fn total(&self) -> usize {
        self.background + self.foreground + self.delayed
    }
}

/// State guarded by the platform lock.
#[derive(Default)]
struct PlatformState {
    initialized: bool,
    thread_pool_size: usize,
    pool: Option<WorkerPool>,
    contexts: ForegroundQueues,
    tracing_controller: Option<Box<dyn TracingController>>,
}

/// Task-scheduling platform for an embedding host.
///
/// Background tasks run on a fixed pool of worker threads. Foreground and
/// delayed tasks belong to a [`ContextId`] and only run inside
/// [`pump_message_loop`](Self::pump_message_loop) on the caller's thread.
pub struct DefaultPlatform {
    state: Mutex<PlatformState>,
    queue: Arc<TaskQueue>,
    worker_options: WorkerOptions,
}

impl DefaultPlatform {
    /// Create an uninitialised platform with default worker options.
    pub fn new() -> Self {
        Self::with_worker_options(WorkerOptions::default())
    }

    /// Create a platform from a config, with the pool size already set.
    pub fn with_config(config: &PlatformConfig) -> Self {
        let platform = Self::with_worker_options(config.worker_options());
        platform.set_thread_pool_size(config.thread_pool_size);
        platform
    }

    /// Create an uninitialised platform whose workers use `options`.
    pub fn with_worker_options(options: WorkerOptions) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            queue: Arc::new(TaskQueue::new()),
            worker_options: options,
        }
    }

    /// Fix the worker count used by the pool.
    ///
    /// `0` derives the size from the hardware parallelism. The result is
    /// clamped to `1..=MAX_THREAD_POOL_SIZE`. Ignored once the pool exists.
    ///
    /// # Panics
    ///
    /// If `thread_pool_size` is negative.
    pub fn set_thread_pool_size(
        &self,
        thread_pool_size: i32,
    ) {
        assert!(
            thread_pool_size >= 0,
            "thread pool size must not be negative, got {}",
            thread_pool_size
        );
        let mut state = self.state.lock();
        if state.initialized {
            warn!(
                requested = thread_pool_size,
                current = state.thread_pool_size,
                "thread pool already started; size unchanged"
            );
            return;
        }
        state.thread_pool_size = resolve_thread_pool_size(thread_pool_size, hardware_parallelism());
        debug!(size = state.thread_pool_size, "thread pool size set");
    }

    /// Start the worker pool if it has not been started yet.
    ///
    /// Safe to call from several threads; exactly one pool is created. If no
    /// size was set, the automatic size is used. A failed start is not
    /// retried: later background tasks are dropped.
    pub fn ensure_initialized(&self) -> PlatformResult<()> {
        let mut state = self.state.lock();
        if state.initialized {
            return Ok(());
        }
        state.initialized = true;
        if state.thread_pool_size == 0 {
            state.thread_pool_size = resolve_thread_pool_size(0, hardware_parallelism());
        }

        let pool = WorkerPool::spawn(state.thread_pool_size, &self.queue, &self.worker_options)?;
        state.pool = Some(pool);
        Ok(())
    }

    /// Whether the worker pool has been started.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Resolved pool size, or `0` before a size is set or the pool starts.
    pub fn number_of_available_background_threads(&self) -> usize {
        self.state.lock().thread_pool_size
    }

    /// Number of worker threads actually running.
    pub fn worker_count(&self) -> usize {
        self.state.lock().pool.as_ref().map_or(0, WorkerPool::len)
    }

    /// Worker statistics while the pool is running.
    pub fn pool_stats(&self) -> Option<Arc<PoolStats>> {
        self.state
            .lock()
            .pool
            .as_ref()
            .map(|pool| pool.stats().clone())
    }

    /// Run `task` on a worker thread, starting the pool if needed.
    pub fn call_on_background_thread<T: Task>(
        &self,
        task: T,
        expected_runtime: ExpectedRuntime,
    ) -> PlatformResult<()> {
        self.post_background(Box::new(task), expected_runtime)
    }

    fn post_background(
        &self,
        task: BoxedTask,
        expected_runtime: ExpectedRuntime,
    ) -> PlatformResult<()> {
        self.ensure_initialized()?;
        trace!(?expected_runtime, "background task posted");
        self.queue.append(task);
        Ok(())
    }

    /// Queue `task` to run the next time `context` is pumped.
    pub fn call_on_foreground_thread<T: Task>(
        &self,
        context: ContextId,
        task: T,
    ) {
        self.post_foreground(context, Box::new(task));
    }

    fn post_foreground(
        &self,
        context: ContextId,
        task: BoxedTask,
    ) {
        self.state.lock().contexts.enqueue(context, task);
        trace!(%context, "foreground task posted");
    }

    /// Queue `task` for `context`, eligible once `delay_in_seconds` has passed.
    ///
    /// # Panics
    ///
    /// If the delay is negative or not a number.
    pub fn call_delayed_on_foreground_thread<T: Task>(
        &self,
        context: ContextId,
        task: T,
        delay_in_seconds: f64,
    ) {
        self.post_delayed(context, Box::new(task), delay_in_seconds);
    }

    fn post_delayed(
        &self,
        context: ContextId,
        task: BoxedTask,
        delay_in_seconds: f64,
    ) {
        assert!(
            delay_in_seconds >= 0.0,
            "delay must be a non-negative number of seconds, got {}",
            delay_in_seconds
        );
        let delay = Duration::try_from_secs_f64(delay_in_seconds)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY);

        let mut state = self.state.lock();
        let deadline = deadline_after(Instant::now(), delay);
        state.contexts.schedule_at(context, deadline, task);
        drop(state);
        trace!(%context, delay_in_seconds, "delayed task posted");
    }

    /// Idle tasks are not supported.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn call_idle_on_foreground_thread(
        &self,
        context: ContextId,
        _task: Box<dyn IdleTask>,
    ) -> ! {
        panic!(
            "idle tasks are not supported (posted for {}); check idle_tasks_enabled first",
            context
        )
    }

    /// Always `false`.
    pub fn idle_tasks_enabled(
        &self,
        _context: ContextId,
    ) -> bool {
        false
    }

    /// Dispatch a tagged task to the matching entry point.
    ///
    /// # Panics
    ///
    /// On [`PostedTask::Idle`] and on negative delays.
    pub fn post(
        &self,
        posted: PostedTask,
    ) -> PlatformResult<()> {
        match posted {
            PostedTask::Background {
                task,
                expected_runtime,
            } => self.post_background(task, expected_runtime)?,
            PostedTask::Foreground { context, task } => self.post_foreground(context, task),
            PostedTask::Delayed {
                context,
                task,
                delay_in_seconds,
            } => self.post_delayed(context, task, delay_in_seconds),
            PostedTask::Idle { context, task } => self.call_idle_on_foreground_thread(context, task),
        }
        Ok(())
    }

    /// Promote due delayed tasks for `context`, then run at most one
    /// foreground task on the calling thread.
    ///
    /// Returns whether a task ran. Never blocks waiting for work.
    pub fn pump_message_loop(
        &self,
        context: ContextId,
    ) -> bool {
        let task = {
            let mut state = self.state.lock();
            let promoted = state.contexts.promote_due(context, Instant::now());
            if promoted > 0 {
                trace!(%context, promoted, "delayed tasks promoted");
            }
            state.contexts.pop_next(context)
        };

        match task {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Seconds on the process-wide monotonic clock.
    pub fn monotonically_increasing_time(&self) -> f64 {
        monotonic_seconds()
    }

    /// Whether `context` has queues.
    pub fn has_context(
        &self,
        context: ContextId,
    ) -> bool {
        self.state.lock().contexts.contains(context)
    }

    /// Foreground tasks waiting for `context`, not counting delayed ones.
    pub fn pending_foreground_tasks(
        &self,
        context: ContextId,
    ) -> usize {
        self.state
            .lock()
            .contexts
            .get(context)
            .map_or(0, |queues| queues.foreground_len())
    }

    /// Delayed tasks waiting for `context`, due or not.
    pub fn pending_delayed_tasks(
        &self,
        context: ContextId,
    ) -> usize {
        self.state
            .lock()
            .contexts
            .get(context)
            .map_or(0, |queues| queues.delayed_len())
    }

    /// Background tasks not yet picked up by a worker.
    pub fn pending_background_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Attach a tracing controller. The platform owns it from now on.
    ///
    /// A previously attached controller is stopped and dropped.
    pub fn set_tracing_controller(
        &self,
        controller: Box<dyn TracingController>,
    ) {
        let previous = self.state.lock().tracing_controller.replace(controller);
        if let Some(mut previous) = previous {
            debug!("replacing tracing controller");
            previous.stop_tracing();
        }
    }

    /// Whether a tracing controller is attached.
    pub fn has_tracing_controller(&self) -> bool {
        self.state.lock().tracing_controller.is_some()
    }

    /// Forward a trace event. Returns `0` without a controller.
    pub fn add_trace_event(
        &self,
        event: &TraceEvent<'_>,
    ) -> u64 {
        match self.state.lock().tracing_controller.as_mut() {
            Some(controller) => controller.add_trace_event(event),
            None => 0,
        }
    }

    /// Forward a duration update. Does nothing without a controller.
    pub fn update_trace_event_duration(
        &self,
        category: &CategoryGroupFlag,
        name: &str,
        handle: u64,
    ) {
        if let Some(controller) = self.state.lock().tracing_controller.as_mut() {
            controller.update_trace_event_duration(category, name, handle);
        }
    }

    /// Flag for a category group; the shared disabled flag without a controller.
    pub fn get_category_group_enabled(
        &self,
        name: &str,
    ) -> CategoryGroupFlag {
        match self.state.lock().tracing_controller.as_mut() {
            Some(controller) => controller.get_category_group_enabled(name),
            None => CategoryGroupFlag::disabled(),
        }
    }

    /// Whether the named category group is recording.
    pub fn is_category_enabled(
        &self,
        name: &str,
    ) -> bool {
        self.get_category_group_enabled(name).is_enabled()
    }

    /// Name of a category group; a placeholder without a controller.
    pub fn get_category_group_name(
        &self,
        category: &CategoryGroupFlag,
    ) -> String {
        match self.state.lock().tracing_controller.as_ref() {
            Some(controller) => controller.get_category_group_name(category),
            None => PLACEHOLDER_CATEGORY_NAME.to_string(),
        }
    }

    /// Tear the platform down.
    ///
    /// Stops and joins every worker, drops every pending task unrun, and
    /// stops the tracing controller. Calling it again only drops tasks
    /// posted since the previous call. [`Drop`] calls this.
    pub fn shutdown(&mut self) -> TeardownReport {
        self.queue.terminate();

        // Join outside the lock: tasks still running on workers may post.
        let pool = self.state.lock().pool.take();
        if let Some(mut pool) = pool {
            pool.join_all();
        }

        let background = self.queue.drain();
        let (drained, controller) = {
            let mut state = self.state.lock();
            (state.contexts.drain_all(), state.tracing_controller.take())
        };

        let report = TeardownReport {
            background: background.len(),
            foreground: drained.foreground.len(),
            delayed: drained.delayed.len(),
        };
        drop(background);
        drop(drained);

        if let Some(mut controller) = controller {
            controller.stop_tracing();
        }

        debug!(
            background = report.background,
            foreground = report.foreground,
            delayed = report.delayed,
            "platform torn down"
        );
        report
    }
}

impl Default for DefaultPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DefaultPlatform {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DefaultPlatform {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DefaultPlatform")
            .field("initialized", &state.initialized)
            .field("thread_pool_size", &state.thread_pool_size)
            .field("contexts", &state.contexts.context_count())
            .field("tracing_controller", &state.tracing_controller.is_some())
            .field("queue", &self.queue)
            .finish()
    }
}
