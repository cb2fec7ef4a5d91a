//! Lifecycle controller for the timer queue worker.
//!
//! `TimerService` owns at most one worker at a time. It starts the worker
//! lazily, tears it down either by blocking on the thread join or through a
//! sequence of non-blocking polls, and offers the timer convenience API on
//! top of whatever worker is current.
//!
//! A worker stays in the slot until its thread has been joined. While a
//! blocking teardown is joining, other callers of `instance` and `destroy`
//! wait for it to finish; callers on the worker thread itself get
//! [`TimerError::ShuttingDown`] instead.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::task::Poll;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::queue::{DeferredFn, Mailbox};
use crate::timer::TimerHandle;

use super::engine::Engine;
use super::handle::TimerQueue;
use super::types::{LifecycleState, QueueOptions, SharedState, TimerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepting commands.
    Running,
    /// Shutdown accepted by a non-blocking destroy; waiting for the thread to exit.
    Joining,
    /// A blocking destroy has taken the join handle and is waiting on it.
    TearingDown,
}

/// A worker and its join handle.
struct Instance {
    queue: TimerQueue,
    thread: ThreadId,
    /// `None` only while a blocking destroy is joining.
    worker: Option<JoinHandle<()>>,
    phase: Phase,
}

impl Instance {
    fn on_worker_thread(&self) -> bool {
        self.thread == thread::current().id()
    }

    fn accepts_commands(&self) -> bool {
        self.phase == Phase::Running && self.queue.is_running()
    }
}

#[derive(Default)]
struct Slot {
    instance: Option<Instance>,
    torn_down: bool,
}

impl Slot {
    fn tearing_down(&self) -> Option<&Instance> {
        self.instance
            .as_ref()
            .filter(|instance| instance.phase == Phase::TearingDown)
    }

    fn release(&mut self) {
        self.instance = None;
        self.torn_down = true;
    }
}

/// Owner of the timer queue worker.
pub struct TimerService {
    options: QueueOptions,
    slot: Mutex<Slot>,
    released: Condvar,
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService {
    /// Create a service with default options. No thread is started yet.
    pub fn new() -> Self {
        Self::with_options(QueueOptions::default())
    }

    /// Create a service with the given worker options.
    pub fn with_options(options: QueueOptions) -> Self {
        Self {
            options,
            slot: Mutex::new(Slot::default()),
            released: Condvar::new(),
        }
    }

    /// Get the worker options.
    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_slot(&self) -> Option<MutexGuard<'_, Slot>> {
        match self.slot.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Wait until no blocking teardown is in progress.
    fn wait_settled<'a>(&'a self, mut slot: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        while slot.tearing_down().is_some() {
            slot = self
                .released
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slot
    }

    /// Lock the slot once no blocking teardown is in progress.
    ///
    /// The worker being torn down cannot wait for its own join, so it gets
    /// `ShuttingDown` instead.
    fn lock_settled(&self) -> Result<MutexGuard<'_, Slot>, TimerError> {
        let slot = self.lock_slot();
        if slot.tearing_down().is_some_and(Instance::on_worker_thread) {
            return Err(TimerError::ShuttingDown);
        }
        Ok(self.wait_settled(slot))
    }

    fn ensure_instance(&self, slot: &mut Slot) -> Result<TimerQueue, TimerError> {
        if let Some(instance) = &slot.instance {
            if !instance.accepts_commands() {
                return Err(TimerError::ShuttingDown);
            }
            return Ok(instance.queue.clone());
        }

        let mailbox = Arc::new(Mailbox::new());
        let state = Arc::new(SharedState::new(LifecycleState::NotStarted));
        let worker = Engine::new(Arc::clone(&mailbox), Arc::clone(&state), &self.options)
            .spawn(&self.options.thread_name)?;

        let queue = TimerQueue::new(mailbox, state);
        slot.instance = Some(Instance {
            queue: queue.clone(),
            thread: worker.thread().id(),
            worker: Some(worker),
            phase: Phase::Running,
        });
        tracing::debug!(thread = %self.options.thread_name, "timer queue instance created");

        Ok(queue)
    }

    /// Get the current worker, starting one if none is running.
    ///
    /// Waits for a blocking teardown in progress on another thread, then
    /// starts a fresh worker. Returns [`TimerError::ShuttingDown`] while a
    /// non-blocking teardown is outstanding.
    pub fn instance(&self) -> Result<TimerQueue, TimerError> {
        let mut slot = self.lock_settled()?;
        self.ensure_instance(&mut slot)
    }

    /// Stop the worker and wait for its thread to exit.
    ///
    /// Does nothing when no worker is running. The guard is released while
    /// joining, so callbacks still in flight may use this service; the
    /// worker stays registered until the join completes.
    pub fn destroy(&self) -> Result<(), TimerError> {
        let (queue, worker) = {
            let slot = self.lock_slot();
            if slot
                .instance
                .as_ref()
                .is_some_and(Instance::on_worker_thread)
            {
                return Err(TimerError::DestroyFromWorker);
            }

            let mut slot = self.wait_settled(slot);
            let Some(instance) = slot.instance.as_mut() else {
                return Ok(());
            };
            let Some(worker) = instance.worker.take() else {
                return Ok(());
            };
            if instance.phase == Phase::Running {
                instance.queue.request_shutdown();
            }
            instance.phase = Phase::TearingDown;
            (instance.queue.clone(), worker)
        };

        let joined = worker.join();

        self.lock_slot().release();
        self.released.notify_all();

        if joined.is_err() {
            queue.state.set(LifecycleState::Stopped);
            tracing::warn!("timer worker exited abnormally");
            return Err(TimerError::WorkerPanicked);
        }

        tracing::debug!("timer queue destroyed");
        Ok(())
    }

    /// Take one non-blocking step towards tearing the worker down.
    ///
    /// Returns `Poll::Ready(())` once no worker remains. Each call either
    /// submits the shutdown, checks whether the thread has exited, or
    /// releases the finished instance; it never waits on a lock or a join.
    /// Callers poll this repeatedly, typically on a fixed interval.
    pub fn destroy_async(&self) -> Poll<()> {
        let Some(mut slot) = self.try_lock_slot() else {
            return Poll::Pending;
        };
        let Some(instance) = slot.instance.as_mut() else {
            return Poll::Ready(());
        };

        match instance.phase {
            Phase::TearingDown => return Poll::Pending,
            Phase::Running => {
                let finished = instance.worker.as_ref().is_some_and(JoinHandle::is_finished);
                if finished || instance.queue.try_request_shutdown() {
                    tracing::debug!("timer queue shutdown submitted");
                    instance.phase = Phase::Joining;
                }
                return Poll::Pending;
            }
            Phase::Joining => {}
        }

        let Some(worker) = instance.worker.take_if(|worker| worker.is_finished()) else {
            return Poll::Pending;
        };
        if worker.join().is_err() {
            instance.queue.state.set(LifecycleState::Stopped);
            tracing::warn!("timer worker exited abnormally");
        }

        slot.release();
        drop(slot);
        self.released.notify_all();
        tracing::debug!("timer queue destroyed");
        Poll::Ready(())
    }

    /// Drive [`destroy_async`](Self::destroy_async) on a tokio interval until it completes.
    pub async fn shutdown(&self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.destroy_async().is_ready() {
                break;
            }
        }
    }

    /// Get the lifecycle state of the current worker.
    pub fn state(&self) -> LifecycleState {
        let slot = self.lock_slot();
        match &slot.instance {
            Some(instance) => instance.queue.state(),
            None if slot.torn_down => LifecycleState::Stopped,
            None => LifecycleState::NotStarted,
        }
    }

    /// Create a timer. The timer is not started.
    pub fn create<F>(
        name: impl Into<String>,
        period: Duration,
        repeat: bool,
        callback: F,
    ) -> Result<TimerHandle, TimerError>
    where
        F: Fn(&TimerHandle) + Send + Sync + 'static,
    {
        TimerHandle::create(name, period, repeat, callback)
    }

    /// Start a timer on the current worker.
    pub fn start(&self, timer: &TimerHandle) -> Result<(), TimerError> {
        self.instance()?.start_timer(timer);
        Ok(())
    }

    /// Stop a timer on the current worker.
    pub fn stop(&self, timer: &TimerHandle) -> Result<(), TimerError> {
        self.instance()?.stop_timer(timer);
        Ok(())
    }

    /// Change a timer's period and restart it.
    ///
    /// The period is left unchanged if no worker can take the restart.
    pub fn set_period(&self, timer: &TimerHandle, period: Duration) -> Result<(), TimerError> {
        let queue = self.instance()?;
        timer.store_period(period)?;
        queue.start_timer(timer);
        Ok(())
    }

    fn try_queue(&self) -> Option<TimerQueue> {
        let mut slot = self.try_lock_slot()?;
        if slot.tearing_down().is_some() {
            return None;
        }
        match self.ensure_instance(&mut slot) {
            Ok(queue) => Some(queue),
            Err(TimerError::ShuttingDown) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to start timer queue");
                None
            }
        }
    }

    /// Non-blocking [`start`](Self::start).
    ///
    /// Returns `false` if the caller should retry, including while a
    /// teardown is in progress.
    pub fn try_start(&self, timer: &TimerHandle) -> bool {
        self.try_queue()
            .is_some_and(|queue| queue.try_start_timer(timer))
    }

    /// Non-blocking [`stop`](Self::stop). Returns `false` if the caller should retry.
    pub fn try_stop(&self, timer: &TimerHandle) -> bool {
        self.try_queue()
            .is_some_and(|queue| queue.try_stop_timer(timer))
    }

    /// Run a closure once on the worker thread.
    pub fn pend(&self, func: impl FnOnce() + Send + 'static) -> Result<(), TimerError> {
        self.instance()?.pend(func);
        Ok(())
    }

    /// Run `func(arg1, arg2)` once on the worker thread.
    pub fn pend_function(&self, func: DeferredFn, arg1: usize, arg2: u32) -> Result<(), TimerError> {
        self.instance()?.pend_function(func, arg1, arg2);
        Ok(())
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(mut instance) = slot.instance.take() else {
            return;
        };

        if instance.phase == Phase::Running {
            instance.queue.request_shutdown();
        }
        if instance.on_worker_thread() {
            // Dropped from one of our own callbacks; the worker exits after it returns.
            return;
        }
        let Some(worker) = instance.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            tracing::warn!("timer worker exited abnormally");
        }
    }
}
