//! Timer handle type.
//!
//! A `TimerHandle` describes one schedulable timer. Handles are cheap to clone;
//! every clone refers to the same timer and compares equal by [`TimerId`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use crate::scheduler::TimerError;

/// Callback invoked on the worker thread each time a timer fires.
pub type TimerCallback = dyn Fn(&TimerHandle) + Send + Sync + 'static;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying integer value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

struct TimerInner {
    id: TimerId,
    name: String,
    callback: Box<TimerCallback>,
    period_nanos: AtomicU64,
    repeat: AtomicBool,
    active: AtomicBool,
    next_trigger: Mutex<Option<Instant>>,
}

/// Handle to a periodic or one-shot timer.
///
/// Creating a handle does not register it anywhere; it only starts firing
/// once a `Start` command for it has been processed by a timer queue.
#[derive(Clone)]
pub struct TimerHandle {
    inner: Arc<TimerInner>,
}

impl TimerHandle {
    /// Create a new, inactive timer.
    ///
    /// Returns [`TimerError::InvalidPeriod`] for a repeating timer with a
    /// zero period.
    ///
    /// The callback receives the firing handle, so it never needs to capture
    /// its own timer. A callback that does hold a clone of its own handle
    /// keeps the timer alive forever; capture a [`TimerHandle::downgrade`]
    /// reference instead.
    pub fn create<F>(
        name: impl Into<String>,
        period: Duration,
        repeat: bool,
        callback: F,
    ) -> Result<Self, TimerError>
    where
        F: Fn(&TimerHandle) + Send + Sync + 'static,
    {
        let name = name.into();
        validate_period(&name, period, repeat)?;

        Ok(Self {
            inner: Arc::new(TimerInner {
                id: TimerId::next(),
                name,
                callback: Box::new(callback),
                period_nanos: AtomicU64::new(duration_to_nanos(period)),
                repeat: AtomicBool::new(repeat),
                active: AtomicBool::new(false),
                next_trigger: Mutex::new(None),
            }),
        })
    }

    /// Non-owning reference to this timer.
    pub fn downgrade(&self) -> WeakTimerHandle {
        WeakTimerHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Get the timer's identifier.
    pub fn id(&self) -> TimerId {
        self.inner.id
    }

    /// Get the timer's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the current period.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.inner.period_nanos.load(Ordering::Acquire))
    }

    /// Whether the timer re-arms itself after firing.
    pub fn repeats(&self) -> bool {
        self.inner.repeat.load(Ordering::Acquire)
    }

    /// Whether the timer is currently scheduled on a worker.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Deadline of the next firing, as last written by the worker.
    pub fn next_trigger(&self) -> Option<Instant> {
        *self
            .inner
            .next_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the period. Takes effect at the next `Start`.
    pub(crate) fn store_period(&self, period: Duration) -> Result<(), TimerError> {
        validate_period(self.name(), period, self.repeats())?;
        self.inner
            .period_nanos
            .store(duration_to_nanos(period), Ordering::Release);
        Ok(())
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.inner.active.store(active, Ordering::Release);
    }

    pub(crate) fn set_next_trigger(&self, deadline: Option<Instant>) {
        *self
            .inner
            .next_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = deadline;
    }

    pub(crate) fn invoke(&self) {
        (self.inner.callback)(self);
    }
}

/// Non-owning reference to a timer, obtained from [`TimerHandle::downgrade`].
#[derive(Clone)]
pub struct WeakTimerHandle {
    inner: Weak<TimerInner>,
}

impl WeakTimerHandle {
    /// Get the timer back if it is still alive.
    pub fn upgrade(&self) -> Option<TimerHandle> {
        self.inner.upgrade().map(|inner| TimerHandle { inner })
    }
}

impl fmt::Debug for WeakTimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakTimerHandle").finish_non_exhaustive()
    }
}

impl PartialEq for TimerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TimerHandle {}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("period", &self.period())
            .field("repeat", &self.repeats())
            .field("active", &self.is_active())
            .finish()
    }
}

fn validate_period(name: &str, period: Duration, repeat: bool) -> Result<(), TimerError> {
    if repeat && period.is_zero() {
        return Err(TimerError::InvalidPeriod {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn duration_to_nanos(period: Duration) -> u64 {
    u64::try_from(period.as_nanos()).unwrap_or(u64::MAX)
}
