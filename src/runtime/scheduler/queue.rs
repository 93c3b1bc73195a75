//! Background task queue.
//!
//! Multi-producer, multi-consumer FIFO feeding the worker threads. Consumers
//! block until a task arrives or the queue is terminated.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use super::task::BoxedTask;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<BoxedTask>,
    terminated: bool,
}

/// A thread-safe blocking task queue with an explicit terminate signal.
#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl TaskQueue {
    /// Create a new empty task queue.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a task to the back of the queue and wake one waiting consumer.
    ///
    /// A task appended after [`terminate`](Self::terminate) is dropped unrun.
    pub fn append(
        &self,
        task: BoxedTask,
    ) {
        let mut state = self.state.lock();
        if state.terminated {
            drop(state);
            warn!("background task submitted after termination; dropping it");
            drop(task);
            return;
        }
        state.tasks.push_back(task);
        drop(state);
        self.available.notify_one();
    }

    /// Block until a task is available and pop it.
    ///
    /// Returns `None` once the queue is terminated, even if tasks remain.
    pub fn get_next(&self) -> Option<BoxedTask> {
        let mut state = self.state.lock();
        loop {
            if state.terminated {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            self.available.wait(&mut state);
        }
    }

    /// Pop a task without blocking.
    pub fn try_next(&self) -> Option<BoxedTask> {
        let mut state = self.state.lock();
        if state.terminated {
            return None;
        }
        state.tasks.pop_front()
    }

    /// Wake every consumer and make all further `get_next` calls return `None`.
    pub fn terminate(&self) {
        self.state.lock().terminated = true;
        self.available.notify_all();
    }

    /// Remove every task still queued.
    pub fn drain(&self) -> Vec<BoxedTask> {
        self.state.lock().tasks.drain(..).collect()
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Get the number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("len", &state.tasks.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}
