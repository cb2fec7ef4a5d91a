//! Commands accepted by the timer queue worker.

use std::fmt;

use crate::timer::{TimerHandle, TimerId};

/// Plain function accepted by `pend_function`, with two opaque arguments.
pub type DeferredFn = fn(usize, u32);

/// A one-shot call executed on the worker thread.
pub(crate) struct PendingCall {
    func: Box<dyn FnOnce() + Send + 'static>,
}

impl PendingCall {
    /// Wrap a closure.
    pub(crate) fn new(func: impl FnOnce() + Send + 'static) -> Self {
        Self {
            func: Box::new(func),
        }
    }

    /// Wrap a plain function and its two word-sized arguments.
    pub(crate) fn with_args(func: DeferredFn, arg1: usize, arg2: u32) -> Self {
        Self::new(move || func(arg1, arg2))
    }

    pub(crate) fn call(self) {
        (self.func)()
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall").finish_non_exhaustive()
    }
}

/// Commands that can be sent to the worker.
#[derive(Debug)]
pub(crate) enum TimerCommand {
    /// Arm a timer at `now + period`, inserting it if needed.
    Start(TimerHandle),
    /// Remove a timer from the active list.
    Stop(TimerId),
    /// Run a deferred call on the worker.
    Pend(PendingCall),
    /// Exit the worker loop.
    Shutdown,
}

impl TimerCommand {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TimerCommand::Start(_) => "start",
            TimerCommand::Stop(_) => "stop",
            TimerCommand::Pend(_) => "pend",
            TimerCommand::Shutdown => "shutdown",
        }
    }
}
