//! Per-context foreground and delayed queues.
//!
//! The registry is not synchronised itself; the platform keeps it behind its
//! global lock.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::time::Instant;

use indexmap::IndexMap;

use super::task::{BoxedTask, ContextId};

/// A task waiting for its deadline.
struct DelayedEntry {
    deadline: Instant,
    seq: u64,
    task: BoxedTask,
}

impl PartialEq for DelayedEntry {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    // Reversed so the max-heap yields the earliest deadline, then the
    // earliest submission.
    fn cmp(
        &self,
        other: &Self,
    ) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Deadline-ordered queue of delayed tasks.
///
/// Tasks with equal deadlines pop in insertion order.
#[derive(Default)]
pub struct DelayedTaskQueue {
    heap: BinaryHeap<DelayedEntry>,
    next_seq: u64,
}

impl DelayedTaskQueue {
    /// Create an empty queue.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task that becomes due at `deadline`.
    pub fn push(
        &mut self,
        deadline: Instant,
        task: BoxedTask,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(DelayedEntry {
            deadline,
            seq,
            task,
        });
    }

    /// Earliest deadline, if any.
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Pop the earliest task if its deadline is at or before `now`.
    ///
    /// Leaves the queue untouched otherwise.
    pub fn pop_due(
        &mut self,
        now: Instant,
    ) -> Option<BoxedTask> {
        match self.heap.peek() {
            Some(entry) if entry.deadline <= now => self.heap.pop().map(|entry| entry.task),
            _ => None,
        }
    }

    /// Remove every task regardless of deadline.
    pub fn drain(&mut self) -> Vec<BoxedTask> {
        self.heap.drain().map(|entry| entry.task).collect()
    }

    /// Get the number of queued tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl std::fmt::Debug for DelayedTaskQueue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DelayedTaskQueue")
            .field("len", &self.heap.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// The queue pair owned by one context.
#[derive(Default)]
pub struct ContextQueues {
    foreground: VecDeque<BoxedTask>,
    delayed: DelayedTaskQueue,
}

impl ContextQueues {
    /// Queued foreground tasks.
    #[inline]
    pub fn foreground_len(&self) -> usize {
        self.foreground.len()
    }

    /// Queued delayed tasks.
    #[inline]
    pub fn delayed_len(&self) -> usize {
        self.delayed.len()
    }
}

impl std::fmt::Debug for ContextQueues {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ContextQueues")
            .field("foreground", &self.foreground.len())
            .field("delayed", &self.delayed)
            .finish()
    }
}

/// Tasks removed from the registry at teardown.
#[derive(Default)]
pub struct DrainedTasks {
    /// Foreground tasks, per context in registration order.
    pub foreground: Vec<BoxedTask>,
    /// Delayed tasks, per context in registration order.
    pub delayed: Vec<BoxedTask>,
}

/// Registry mapping each context to its queue pair.
///
/// Entries are created on first use and only removed by [`drain_all`](Self::drain_all).
#[derive(Debug, Default)]
pub struct ForegroundQueues {
    contexts: IndexMap<ContextId, ContextQueues>,
}

impl ForegroundQueues {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(
        &mut self,
        context: ContextId,
    ) -> &mut ContextQueues {
        self.contexts.entry(context).or_default()
    }

    /// Append a foreground task for `context`.
    pub fn enqueue(
        &mut self,
        context: ContextId,
        task: BoxedTask,
    ) {
        self.entry(context).foreground.push_back(task);
    }

    /// Insert a delayed task for `context`.
    pub fn schedule_at(
        &mut self,
        context: ContextId,
        deadline: Instant,
        task: BoxedTask,
    ) {
        self.entry(context).delayed.push(deadline, task);
    }

    /// Pop the oldest foreground task for `context`.
    pub fn pop_next(
        &mut self,
        context: ContextId,
    ) -> Option<BoxedTask> {
        self.contexts
            .get_mut(&context)
            .and_then(|queues| queues.foreground.pop_front())
    }

    /// Pop the earliest delayed task for `context` if it is due at `now`.
    pub fn pop_due(
        &mut self,
        context: ContextId,
        now: Instant,
    ) -> Option<BoxedTask> {
        self.contexts
            .get_mut(&context)
            .and_then(|queues| queues.delayed.pop_due(now))
    }

    /// Move every delayed task due at `now` to the back of the foreground
    /// queue, earliest deadline first. Returns how many moved.
    pub fn promote_due(
        &mut self,
        context: ContextId,
        now: Instant,
    ) -> usize {
        let Some(queues) = self.contexts.get_mut(&context) else {
            return 0;
        };
        let mut promoted = 0;
        while let Some(task) = queues.delayed.pop_due(now) {
            queues.foreground.push_back(task);
            promoted += 1;
        }
        promoted
    }

    /// Queues for `context`, if it has ever been used.
    #[inline]
    pub fn get(
        &self,
        context: ContextId,
    ) -> Option<&ContextQueues> {
        self.contexts.get(&context)
    }

    /// Whether `context` has an entry.
    #[inline]
    pub fn contains(
        &self,
        context: ContextId,
    ) -> bool {
        self.contexts.contains_key(&context)
    }

    /// Number of registered contexts.
    #[inline]
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Remove every context and return all of their pending tasks.
    pub fn drain_all(&mut self) -> DrainedTasks {
        let mut drained = DrainedTasks::default();
        for (_, mut queues) in self.contexts.drain(..) {
            drained.foreground.extend(queues.foreground.drain(..));
            drained.delayed.extend(queues.delayed.drain());
        }
        drained
    }
}
