//! Testing utilities for users of the tickq library.
//!
//! This module provides helpers for testing code built on timer queues:
//!
//! - [`FireRecorder`]: Builds timer callbacks that record every firing
//! - [`wait_until`]: Polls a condition with a timeout

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::timer::{TimerHandle, TimerId};

/// One recorded firing.
#[derive(Debug, Clone)]
pub struct Firing {
    /// Timer that fired.
    pub timer: TimerId,
    /// Timer name at the time of firing.
    pub name: String,
    /// When the callback ran.
    pub at: Instant,
    /// Whether the timer was still active inside its callback.
    pub active: bool,
}

/// Records timer firings for later assertions.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tickq::TimerService;
/// use tickq::testing::{FireRecorder, wait_until};
///
/// let service = TimerService::new();
/// let recorder = FireRecorder::new();
/// let timer = TimerService::create("tick", Duration::from_millis(10), false, recorder.callback())
///     .unwrap();
///
/// service.start(&timer).unwrap();
/// assert!(wait_until(Duration::from_secs(5), || recorder.count(timer.id()) == 1));
/// service.destroy().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct FireRecorder {
    firings: Arc<Mutex<Vec<Firing>>>,
}

impl FireRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that records each firing into this recorder.
    pub fn callback(&self) -> impl Fn(&TimerHandle) + Send + Sync + 'static {
        let firings = Arc::clone(&self.firings);
        move |timer: &TimerHandle| {
            firings
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Firing {
                    timer: timer.id(),
                    name: timer.name().to_string(),
                    at: Instant::now(),
                    active: timer.is_active(),
                });
        }
    }

    /// All firings so far, in order.
    pub fn firings(&self) -> Vec<Firing> {
        self.firings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of firings for one timer.
    pub fn count(&self, timer: TimerId) -> usize {
        self.firings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|f| f.timer == timer)
            .count()
    }

    /// Total number of firings.
    pub fn total(&self) -> usize {
        self.firings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Firing counts grouped by timer name.
    pub fn counts_by_name(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for firing in self.firings.lock().unwrap_or_else(PoisonError::into_inner).iter() {
            *counts.entry(firing.name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Firing instants for one timer.
    pub fn instants(&self, timer: TimerId) -> Vec<Instant> {
        self.firings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|f| f.timer == timer)
            .map(|f| f.at)
            .collect()
    }
}

/// Poll `condition` every millisecond until it holds or `timeout` elapses.
///
/// Returns whether the condition was observed to hold.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
