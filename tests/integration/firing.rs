//! Timer firing integration tests.
//!
//! Tests that verify cadence, one-shot behavior, ordering, and how the worker
//! reacts to commands while it sleeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tickq::testing::{FireRecorder, wait_until};
use tickq::{TimerHandle, TimerService};

use crate::common::assert_near;

/// Test: two repeating timers fire at their own cadence and stop after destroy.
///
/// Mirrors the classic demo: 200ms and 500ms timers observed for 2020ms.
#[test]
fn test_two_repeating_timers_fire_at_their_cadence() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();

    let a = TimerService::create("timer 1", Duration::from_millis(200), true, recorder.callback())
        .unwrap();
    let b = TimerService::create("timer 2", Duration::from_millis(500), true, recorder.callback())
        .unwrap();

    service.start(&a).unwrap();
    service.start(&b).unwrap();

    thread::sleep(Duration::from_millis(2020));

    service.stop(&a).unwrap();
    service.stop(&b).unwrap();
    service.destroy().unwrap();

    let a_count = recorder.count(a.id());
    let b_count = recorder.count(b.id());
    assert_near(a_count, 10, 1, "timer 1 firings");
    assert_near(b_count, 4, 1, "timer 2 firings");

    // No firings after teardown.
    let total = recorder.total();
    thread::sleep(Duration::from_millis(600));
    assert_eq!(recorder.total(), total);
    assert!(!a.is_active() && !b.is_active());
}

/// Test: repeating timer deadlines stay on the original grid.
#[test]
fn test_repeating_timer_does_not_accumulate_drift() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let period = Duration::from_millis(50);
    let timer = TimerService::create("grid", period, true, recorder.callback()).unwrap();

    let started = Instant::now();
    service.start(&timer).unwrap();
    assert!(wait_until(Duration::from_secs(5), || recorder.count(timer.id()) >= 10));
    service.destroy().unwrap();

    let instants = recorder.instants(timer.id());
    let first = instants[0];
    let tenth = instants[9];

    // Nine periods between the first and tenth firing, up to scheduling latency.
    let span = tenth - first;
    assert!(span >= period * 9 - Duration::from_millis(5), "span {:?}", span);
    assert!(span < period * 9 + Duration::from_millis(100), "span {:?}", span);
    assert!(first - started >= period - Duration::from_millis(5));
}

/// Test: a one-shot timer fires exactly once per start and is inactive afterwards.
#[test]
fn test_one_shot_fires_once_per_start() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let timer = TimerService::create("once", Duration::from_millis(30), false, recorder.callback())
        .unwrap();

    service.start(&timer).unwrap();
    assert!(wait_until(Duration::from_secs(5), || recorder.count(timer.id()) == 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(recorder.count(timer.id()), 1);
    assert!(!timer.is_active());

    // Inside its callback the timer already reads as inactive.
    assert!(recorder.firings().iter().all(|f| !f.active));

    service.start(&timer).unwrap();
    assert!(wait_until(Duration::from_secs(5), || recorder.count(timer.id()) == 2));
    service.destroy().unwrap();
}

/// Test: stop prevents a pending firing.
#[test]
fn test_stop_before_deadline_prevents_firing() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let timer = TimerService::create("late", Duration::from_millis(200), false, recorder.callback())
        .unwrap();

    service.start(&timer).unwrap();
    assert!(wait_until(Duration::from_secs(5), || timer.is_active()));
    service.stop(&timer).unwrap();
    assert!(wait_until(Duration::from_secs(5), || !timer.is_active()));

    thread::sleep(Duration::from_millis(300));
    assert_eq!(recorder.count(timer.id()), 0);
    service.destroy().unwrap();
}

/// Test: timers due in the same pass fire in deadline order.
#[test]
fn test_timers_fire_in_deadline_order() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let queue = service.instance().unwrap();

    let timers: Vec<TimerHandle> = [90u64, 30, 60]
        .into_iter()
        .map(|ms| {
            TimerService::create(format!("t{ms}"), Duration::from_millis(ms), false, recorder.callback())
                .unwrap()
        })
        .collect();

    for timer in &timers {
        service.start(timer).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || timers.iter().all(|t| t.is_active())));

    // Keep the worker busy until all three are due, so they fire in one pass.
    queue.pend(|| thread::sleep(Duration::from_millis(150)));

    assert!(wait_until(Duration::from_secs(5), || recorder.total() == 3));
    let names: Vec<String> = recorder.firings().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["t30", "t60", "t90"]);
    service.destroy().unwrap();
}

/// Test: a deferred call wakes a worker that sleeps toward a far deadline.
#[test]
fn test_pend_wakes_sleeping_worker() {
    let service = TimerService::new();
    let far = TimerService::create("far", Duration::from_secs(30), true, |_| {}).unwrap();
    service.start(&far).unwrap();
    assert!(wait_until(Duration::from_secs(5), || far.is_active()));
    thread::sleep(Duration::from_millis(20));

    let ran_at = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&ran_at);
    let submitted = Instant::now();
    service
        .pend(move || {
            *slot.lock().unwrap() = Some(Instant::now());
        })
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || ran_at.lock().unwrap().is_some()));
    let latency = ran_at.lock().unwrap().unwrap() - submitted;
    assert!(latency < Duration::from_millis(100), "latency {:?}", latency);

    service.destroy().unwrap();
}

static PENDED: AtomicUsize = AtomicUsize::new(0);

fn record_args(arg1: usize, arg2: u32) {
    PENDED.fetch_add(arg1 + arg2 as usize, Ordering::SeqCst);
}

/// Test: pend_function passes both opaque arguments through.
#[test]
fn test_pend_function_runs_with_arguments() {
    let service = TimerService::new();
    service.pend_function(record_args, 40, 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || PENDED.load(Ordering::SeqCst) == 42));
    service.destroy().unwrap();
}

/// Test: a callback can re-arm its own one-shot timer through the queue.
#[test]
fn test_callback_rearms_one_shot() {
    let service = TimerService::new();
    let queue = service.instance().unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    let hits = Arc::clone(&fired);
    let rearm = queue.clone();
    let timer = TimerService::create("again", Duration::from_millis(10), false, move |h| {
        if hits.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
            rearm.start_timer(h);
        }
    })
    .unwrap();

    queue.start_timer(&timer);
    assert!(wait_until(Duration::from_secs(5), || fired.load(Ordering::SeqCst) == 3));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert!(!timer.is_active());

    service.destroy().unwrap();
}

/// Test: a panicking callback does not take the worker down.
#[test]
fn test_panicking_callback_is_isolated() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let bad = TimerService::create("bad", Duration::from_millis(10), false, |_| panic!("boom"))
        .unwrap();
    let good = TimerService::create("good", Duration::from_millis(20), true, recorder.callback())
        .unwrap();

    service.start(&bad).unwrap();
    service.start(&good).unwrap();

    assert!(wait_until(Duration::from_secs(5), || recorder.count(good.id()) >= 3));
    assert!(service.instance().unwrap().is_running());
    service.destroy().unwrap();
}

/// Test: non-blocking start/stop retried in a loop behave like the blocking ones.
#[test]
fn test_try_start_retry_loop() {
    let service = TimerService::new();
    let recorder = FireRecorder::new();
    let timer = TimerService::create("polled", Duration::from_millis(20), true, recorder.callback())
        .unwrap();

    while !service.try_start(&timer) {}
    assert!(wait_until(Duration::from_secs(5), || recorder.count(timer.id()) >= 2));

    while !service.try_stop(&timer) {}
    assert!(wait_until(Duration::from_secs(5), || !timer.is_active()));
    let count = recorder.count(timer.id());
    thread::sleep(Duration::from_millis(100));
    assert_eq!(recorder.count(timer.id()), count);

    service.destroy().unwrap();
}
