//! Task definitions for the platform.
//!
//! A task is a unit of work with a single entry point. Once handed to the
//! platform it is owned exclusively by it: the task is either run and then
//! dropped, or dropped unrun during teardown.

use std::sync::atomic::{AtomicU64, Ordering};

/// A unit of work with a single entry point.
///
/// `run` consumes the task; whatever the task owns is released when the
/// box is dropped at the end of the call.
pub trait Task: Send + 'static {
    /// Execute the task.
    fn run(self: Box<Self>);
}

impl<F> Task for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// Owned, type-erased task handle.
pub type BoxedTask = Box<dyn Task>;

/// Work that only runs when the host reports idle time.
///
/// The platform never advertises idle-task support, so values of this type
/// are only ever rejected.
pub trait IdleTask: Send + 'static {
    /// Execute with the given deadline (monotonic seconds).
    fn run(
        self: Box<Self>,
        deadline_in_seconds: f64,
    );
}

/// Opaque key for an execution context owned by the embedding host.
///
/// The platform never interprets the value; it is only used to select a
/// context's foreground and delayed queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a process-unique context id.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a key chosen by the host.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the inner value.
    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "Context({})", self.0)
    }
}

/// Expected runtime of a background task, as reported by the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedRuntime {
    /// Finishes quickly.
    #[default]
    Short,
    /// May occupy a worker for a long time.
    Long,
}

/// A task tagged with how it should be scheduled.
pub enum PostedTask {
    /// Runs on any worker thread.
    Background {
        task: BoxedTask,
        expected_runtime: ExpectedRuntime,
    },
    /// Runs when `context` is pumped, in submission order.
    Foreground { context: ContextId, task: BoxedTask },
    /// Becomes a foreground task once `delay_in_seconds` has elapsed.
    Delayed {
        context: ContextId,
        task: BoxedTask,
        delay_in_seconds: f64,
    },
    /// Never accepted.
    Idle {
        context: ContextId,
        task: Box<dyn IdleTask>,
    },
}

impl PostedTask {
    /// Tag a background task.
    pub fn background<T: Task>(task: T) -> Self {
        PostedTask::Background {
            task: Box::new(task),
            expected_runtime: ExpectedRuntime::Short,
        }
    }

    /// Tag a foreground task for `context`.
    pub fn foreground<T: Task>(
        context: ContextId,
        task: T,
    ) -> Self {
        PostedTask::Foreground {
            context,
            task: Box::new(task),
        }
    }

    /// Tag a delayed foreground task for `context`.
    pub fn delayed<T: Task>(
        context: ContextId,
        task: T,
        delay_in_seconds: f64,
    ) -> Self {
        PostedTask::Delayed {
            context,
            task: Box::new(task),
            delay_in_seconds,
        }
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            PostedTask::Background { .. } => "background",
            PostedTask::Foreground { .. } => "foreground",
            PostedTask::Delayed { .. } => "delayed",
            PostedTask::Idle { .. } => "idle",
        }
    }

    /// Context the task is bound to, if any.
    pub fn context(&self) -> Option<ContextId> {
        match self {
            PostedTask::Background { .. } => None,
            PostedTask::Foreground { context, .. }
            | PostedTask::Delayed { context, .. }
            | PostedTask::Idle { context, .. } => Some(*context),
        }
    }
}

impl std::fmt::Debug for PostedTask {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut s = f.debug_struct("PostedTask");
        s.field("kind", &self.kind());
        if let Some(context) = self.context() {
            s.field("context", &context);
        }
        match self {
            PostedTask::Background {
                expected_runtime, ..
            } => s.field("expected_runtime", expected_runtime),
            PostedTask::Delayed {
                delay_in_seconds, ..
            } => s.field("delay_in_seconds", delay_in_seconds),
            _ => &mut s,
        }
        .finish()
    }
}
