//! Control handle for a running timer queue.
//!
//! This module provides the `TimerQueue` type that lets any thread submit
//! start, stop, and deferred-call commands to the worker.

use std::sync::Arc;

use crate::queue::{DeferredFn, Mailbox, PendingCall, TimerCommand};
use crate::timer::TimerHandle;

use super::types::{LifecycleState, SharedState};

/// Handle for submitting commands to a timer queue worker.
///
/// Blocking methods wait only for the mailbox lock, which the worker never
/// holds while running callbacks. The `try_` variants never wait at all and
/// report `false` when the mailbox is momentarily busy.
///
/// Commands sent after the worker has stopped are never processed. The
/// [`TimerService`](super::TimerService) methods refuse them with
/// [`TimerError::ShuttingDown`](super::TimerError::ShuttingDown) instead.
#[derive(Clone)]
pub struct TimerQueue {
    pub(crate) mailbox: Arc<Mailbox>,
    pub(crate) state: Arc<SharedState>,
}

impl TimerQueue {
    pub(crate) fn new(mailbox: Arc<Mailbox>, state: Arc<SharedState>) -> Self {
        Self { mailbox, state }
    }

    /// Arm a timer to fire one period from when the worker processes this request.
    ///
    /// Starting an already active timer restarts its period.
    pub fn start_timer(&self, timer: &TimerHandle) {
        self.mailbox.send(TimerCommand::Start(timer.clone()));
    }

    /// Disarm a timer.
    pub fn stop_timer(&self, timer: &TimerHandle) {
        self.mailbox.send(TimerCommand::Stop(timer.id()));
    }

    /// Non-blocking [`start_timer`](Self::start_timer).
    pub fn try_start_timer(&self, timer: &TimerHandle) -> bool {
        self.mailbox
            .try_send(TimerCommand::Start(timer.clone()))
            .is_ok()
    }

    /// Non-blocking [`stop_timer`](Self::stop_timer).
    pub fn try_stop_timer(&self, timer: &TimerHandle) -> bool {
        self.mailbox.try_send(TimerCommand::Stop(timer.id())).is_ok()
    }

    /// Run a closure once on the worker thread, before its next timer check.
    pub fn pend(&self, func: impl FnOnce() + Send + 'static) {
        self.mailbox.send(TimerCommand::Pend(PendingCall::new(func)));
    }

    /// Run `func(arg1, arg2)` once on the worker thread.
    pub fn pend_function(&self, func: DeferredFn, arg1: usize, arg2: u32) {
        self.mailbox
            .send(TimerCommand::Pend(PendingCall::with_args(func, arg1, arg2)));
    }

    /// Ask the worker to exit.
    pub(crate) fn request_shutdown(&self) {
        self.state.request_stop();
        self.mailbox.send(TimerCommand::Shutdown);
    }

    /// Non-blocking [`request_shutdown`](Self::request_shutdown).
    pub(crate) fn try_request_shutdown(&self) -> bool {
        if self.mailbox.try_send(TimerCommand::Shutdown).is_err() {
            return false;
        }
        self.state.request_stop();
        true
    }

    /// Get the worker's lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Check if the worker is running.
    pub fn is_running(&self) -> bool {
        self.state.get() == LifecycleState::Running
    }

    /// Whether two handles control the same worker.
    pub fn same_queue(&self, other: &TimerQueue) -> bool {
        Arc::ptr_eq(&self.mailbox, &other.mailbox)
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
