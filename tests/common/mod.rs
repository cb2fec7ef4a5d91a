//! Common test utilities shared across integration tests.

use std::time::Duration;
use tickq::TimerService;

/// Poll `destroy_async` on a fixed interval until it reports completion.
///
/// # Panics
///
/// Panics if teardown does not complete within `timeout`.
pub fn poll_teardown(service: &TimerService, interval: Duration, timeout: Duration) -> usize {
    let start = std::time::Instant::now();
    let mut polls = 0;
    while service.destroy_async().is_pending() {
        polls += 1;
        if start.elapsed() > timeout {
            panic!("Timeout waiting for teardown after {} polls", polls);
        }
        std::thread::sleep(interval);
    }
    polls
}

/// Assert that `actual` is within `tolerance` of `expected`.
pub fn assert_near(actual: usize, expected: usize, tolerance: usize, what: &str) {
    assert!(
        actual.abs_diff(expected) <= tolerance,
        "{}: expected {} (±{}), got {}",
        what,
        expected,
        tolerance,
        actual
    );
}
