//! Shared helpers for integration tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use yaoxiang_platform::Task;

/// Counts runs and drops of [`Tracked`] tasks.
#[derive(Debug, Default)]
pub struct Tally {
    order: Mutex<Vec<u32>>,
    ran: AtomicUsize,
    dropped_unrun: AtomicUsize,
}

impl Tally {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn task(
        self: &Arc<Self>,
        id: u32,
    ) -> Tracked {
        Tracked {
            id,
            tally: self.clone(),
            ran: false,
        }
    }

    pub fn order(&self) -> Vec<u32> {
        self.order.lock().clone()
    }

    pub fn ran(&self) -> usize {
        self.ran.load(Ordering::SeqCst)
    }

    pub fn dropped_unrun(&self) -> usize {
        self.dropped_unrun.load(Ordering::SeqCst)
    }
}

pub struct Tracked {
    id: u32,
    tally: Arc<Tally>,
    ran: bool,
}

impl Task for Tracked {
    fn run(mut self: Box<Self>) {
        self.ran = true;
        self.tally.order.lock().push(self.id);
        self.tally.ran.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if !self.ran {
            self.tally.dropped_unrun.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Poll `done` until it holds or `timeout` passes.
pub fn wait_until(
    timeout: Duration,
    mut done: impl FnMut() -> bool,
) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}
