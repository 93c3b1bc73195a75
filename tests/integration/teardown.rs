use crate::support::{wait_until, Tally};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yaoxiang_platform::{create_default_platform, ContextId, DefaultPlatform, ExpectedRuntime};

#[test]
fn test_every_task_ran_or_dropped_exactly_once() {
    let tally = Tally::new();
    let mut platform = create_default_platform(2).unwrap();
    let contexts: Vec<_> = (0..3).map(|_| ContextId::next()).collect();

    let mut posted = 0;
    for id in 0..40 {
        platform
            .call_on_background_thread(tally.task(id), ExpectedRuntime::Short)
            .unwrap();
        posted += 1;
    }
    for (n, context) in contexts.iter().enumerate() {
        let base = 1000 * (n as u32 + 1);
        for i in 0..10 {
            platform.call_on_foreground_thread(*context, tally.task(base + i));
            platform.call_delayed_on_foreground_thread(*context, tally.task(base + 100 + i), 600.0);
            posted += 2;
        }
    }
    for _ in 0..5 {
        platform.pump_message_loop(contexts[0]);
    }

    let report = platform.shutdown();
    assert_eq!(report.delayed, 30);
    assert_eq!(tally.ran() + tally.dropped_unrun(), posted);
    assert_eq!(report.total(), tally.dropped_unrun());
}

#[test]
fn test_shutdown_waits_for_running_task() {
    let finished = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicBool::new(false));
    let mut platform = create_default_platform(1).unwrap();

    let (f, s) = (finished.clone(), started.clone());
    platform
        .call_on_background_thread(
            move || {
                s.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                f.store(true, Ordering::SeqCst);
            },
            ExpectedRuntime::Long,
        )
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || started.load(Ordering::SeqCst)));

    platform.shutdown();
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_teardown_of_never_initialized_platform() {
    let tally = Tally::new();
    let mut platform = DefaultPlatform::new();
    let context = ContextId::next();
    platform.call_on_foreground_thread(context, tally.task(1));

    let report = platform.shutdown();
    assert!(!platform.is_initialized());
    assert_eq!(report.foreground, 1);
    assert_eq!(report.background, 0);
    assert_eq!(tally.dropped_unrun(), 1);
}
