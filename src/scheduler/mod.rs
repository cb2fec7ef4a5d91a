//! Timer queue engine.
//!
//! This module provides the worker loop that fires timers at their deadlines,
//! the handle used to send it commands, and the controller that starts and
//! tears it down.

mod active;
mod engine;
mod handle;
mod lifecycle;
mod types;

pub use handle::TimerQueue;
pub use lifecycle::TimerService;
pub use types::{
    DEFAULT_IDLE_INTERVAL, DEFAULT_THREAD_NAME, LifecycleState, QueueOptions, TimerError,
};
