//! Scheduler type definitions.
//!
//! This module contains error types, lifecycle state, and options for the timer queue.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Default upper bound on how long the worker sleeps with nothing due.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(500);

/// Default name for the worker thread.
pub const DEFAULT_THREAD_NAME: &str = "tickq-worker";

/// Errors that can occur in the timer queue.
#[derive(Debug, Error)]
pub enum TimerError {
    /// A repeating timer was given a zero period.
    #[error("repeating timer '{name}' needs a non-zero period")]
    InvalidPeriod { name: String },

    /// The worker thread could not be spawned.
    #[error("failed to spawn timer worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// `destroy` was called from a callback running on the worker itself.
    #[error("cannot destroy the timer queue from its own worker thread")]
    DestroyFromWorker,

    /// The current worker is being torn down and accepts no more commands.
    #[error("timer queue is shutting down")]
    ShuttingDown,

    /// The worker thread terminated abnormally.
    #[error("timer worker panicked")]
    WorkerPanicked,
}

/// Lifecycle state of a timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No worker has been started yet.
    NotStarted,
    /// The worker is processing commands and firing timers.
    Running,
    /// A shutdown command has been submitted but not yet processed.
    StopRequested,
    /// The worker has exited.
    Stopped,
}

impl LifecycleState {
    fn as_u8(self) -> u8 {
        match self {
            LifecycleState::NotStarted => 0,
            LifecycleState::Running => 1,
            LifecycleState::StopRequested => 2,
            LifecycleState::Stopped => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::NotStarted,
            1 => LifecycleState::Running,
            2 => LifecycleState::StopRequested,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Lifecycle state shared between control handles and the worker.
#[derive(Debug)]
pub(crate) struct SharedState(AtomicU8);

impl SharedState {
    pub(crate) fn new(state: LifecycleState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: LifecycleState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    /// Move `Running` to `StopRequested`; other states are left alone.
    pub(crate) fn request_stop(&self) {
        let _ = self.0.compare_exchange(
            LifecycleState::Running.as_u8(),
            LifecycleState::StopRequested.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Options for a timer queue worker.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Maximum sleep when no timer is pending.
    pub idle_interval: Duration,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            idle_interval: DEFAULT_IDLE_INTERVAL,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl QueueOptions {
    /// Set the idle interval.
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
