//! Timer queue worker.
//!
//! The worker is responsible for:
//! - Draining the command mailbox in batches
//! - Keeping the active timers sorted by deadline
//! - Running deferred calls
//! - Firing due timers with fixed cadence
//!
//! It is the only code that touches the active list, so none of that state
//! needs a lock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::queue::{Mailbox, PendingCall, TimerCommand};

use super::active::ActiveTimers;
use super::types::{LifecycleState, QueueOptions, SharedState, TimerError};

/// State owned by the worker thread.
pub(crate) struct Engine {
    mailbox: Arc<Mailbox>,
    state: Arc<SharedState>,
    active: ActiveTimers,
    pending: Vec<PendingCall>,
    idle_interval: Duration,
}

impl Engine {
    pub(crate) fn new(
        mailbox: Arc<Mailbox>,
        state: Arc<SharedState>,
        options: &QueueOptions,
    ) -> Self {
        Self {
            mailbox,
            state,
            active: ActiveTimers::new(),
            pending: Vec::new(),
            idle_interval: options.idle_interval,
        }
    }

    /// Spawn the worker thread and mark the queue as running.
    pub(crate) fn spawn(self, thread_name: &str) -> Result<JoinHandle<()>, TimerError> {
        let state = Arc::clone(&self.state);
        state.set(LifecycleState::Running);

        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || self.run());

        spawned.map_err(|e| {
            state.set(LifecycleState::Stopped);
            TimerError::Spawn(e)
        })
    }

    /// Main worker loop.
    fn run(mut self) {
        tracing::debug!("timer queue started");

        while self.turn() {}

        self.active.clear();
        self.pending.clear();
        self.state.set(LifecycleState::Stopped);
        tracing::debug!("timer queue stopped");
    }

    /// One loop iteration. Returns `false` once a shutdown has been processed.
    fn turn(&mut self) -> bool {
        let wait = self.wait_time(Instant::now());
        let batch = self.mailbox.recv_batch(wait);

        if !self.apply(batch, Instant::now()) {
            return false;
        }

        self.run_pending();
        self.fire_due(Instant::now());
        true
    }

    /// How long to sleep waiting for commands. `None` means a timer is already due.
    fn wait_time(&self, now: Instant) -> Option<Duration> {
        match self.active.next_deadline() {
            Some(deadline) if deadline <= now => None,
            Some(deadline) => Some(deadline - now),
            None => Some(self.idle_interval),
        }
    }

    /// Apply a batch of commands in submission order.
    ///
    /// Returns `false` if the batch contained a shutdown; anything queued
    /// after it is discarded.
    fn apply(&mut self, batch: Vec<TimerCommand>, now: Instant) -> bool {
        if batch.is_empty() {
            return true;
        }
        tracing::trace!(commands = batch.len(), "processing command batch");

        let mut reorder = false;
        for command in batch {
            tracing::trace!(command = command.kind(), "apply");
            match command {
                TimerCommand::Start(timer) => {
                    self.active.arm(timer, now);
                    reorder = true;
                }
                TimerCommand::Stop(id) => {
                    self.active.disarm(id);
                }
                TimerCommand::Pend(call) => self.pending.push(call),
                TimerCommand::Shutdown => {
                    tracing::debug!(active = self.active.len(), "shutdown requested");
                    return false;
                }
            }
        }

        if reorder {
            self.active.sort();
        }
        true
    }

    /// Run queued deferred calls in the order they were submitted.
    fn run_pending(&mut self) {
        for call in self.pending.drain(..) {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call.call())) {
                tracing::error!(
                    panic = panic_message(payload.as_ref()),
                    "deferred call panicked"
                );
            }
        }
    }

    /// Fire every timer whose deadline has passed.
    fn fire_due(&mut self, now: Instant) {
        for timer in self.active.take_due(now) {
            tracing::trace!(timer = %timer.id(), name = timer.name(), "fired");
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| timer.invoke())) {
                tracing::error!(
                    timer = %timer.id(),
                    name = timer.name(),
                    panic = panic_message(payload.as_ref()),
                    "timer callback panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic>"
    }
}
