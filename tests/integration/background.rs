use crate::support::{wait_until, Tally};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use yaoxiang_platform::runtime::scheduler::WorkerOptions;
use yaoxiang_platform::{create_default_platform, DefaultPlatform, ExpectedRuntime};

#[test]
fn test_pool_of_four_runs_four_tasks_concurrently() {
    let platform = create_default_platform(4).unwrap();
    assert_eq!(platform.number_of_available_background_threads(), 4);

    // Every task waits for all four, so this only finishes if all run at once.
    let barrier = Arc::new(Barrier::new(4));
    let names = Arc::new(Mutex::new(HashSet::new()));
    let (tx, rx) = crossbeam::channel::unbounded();
    for _ in 0..4 {
        let barrier = barrier.clone();
        let names = names.clone();
        let tx = tx.clone();
        platform
            .call_on_background_thread(
                move || {
                    barrier.wait();
                    let name = thread::current().name().map(str::to_string);
                    names.lock().insert(name);
                    let _ = tx.send(());
                },
                ExpectedRuntime::Long,
            )
            .unwrap();
    }
    for _ in 0..4 {
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
    }
    assert_eq!(names.lock().len(), 4);
}

#[test]
fn test_many_tasks_each_run_once() {
    let tally = Tally::new();
    let platform = create_default_platform(3).unwrap();
    for id in 0..200 {
        platform
            .call_on_background_thread(tally.task(id), ExpectedRuntime::Short)
            .unwrap();
    }
    assert!(wait_until(Duration::from_secs(10), || tally.ran() == 200));

    let mut order = tally.order();
    order.sort_unstable();
    assert_eq!(order, (0..200).collect::<Vec<_>>());
    assert_eq!(tally.dropped_unrun(), 0);
}

#[test]
fn test_workers_are_named_from_options() {
    let platform = DefaultPlatform::with_worker_options(WorkerOptions {
        thread_name_prefix: "it-worker".to_string(),
        stack_size: Some(256 * 1024),
    });
    platform.set_thread_pool_size(1);

    let (tx, rx) = crossbeam::channel::bounded(1);
    platform
        .call_on_background_thread(
            move || {
                let _ = tx.send(thread::current().name().map(str::to_string));
            },
            ExpectedRuntime::Short,
        )
        .unwrap();
    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name.as_deref(), Some("it-worker-0"));
}

#[test]
fn test_panicking_task_does_not_kill_worker() {
    let tally = Tally::new();
    let platform = create_default_platform(1).unwrap();

    platform
        .call_on_background_thread(|| panic!("task failure"), ExpectedRuntime::Short)
        .unwrap();
    platform
        .call_on_background_thread(tally.task(1), ExpectedRuntime::Short)
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || tally.ran() == 1));
    let stats = platform.pool_stats().unwrap();
    assert!(wait_until(Duration::from_secs(5), || stats.completed() == 1));
    assert_eq!(stats.panicked(), 1);
}

#[test]
fn test_auto_size_is_within_bounds() {
    let platform = create_default_platform(0).unwrap();
    let size = platform.number_of_available_background_threads();
    assert!((1..=yaoxiang_platform::MAX_THREAD_POOL_SIZE).contains(&size));
}
