//! tickq - a single-worker timer queue.
//!
//! One background thread owns every armed timer and runs every callback.
//! Other threads talk to it through a mailbox of commands, either blocking
//! briefly on the mailbox lock or, with the `try_` variants, not at all.
//! Teardown can block on the thread join ([`TimerService::destroy`]) or be
//! driven in non-blocking steps ([`TimerService::destroy_async`]).

pub mod config;
pub mod queue;
pub mod scheduler;
pub mod testing;
pub mod timer;

pub use config::{ConfigError, SchedulerConfig, TimerConfig, YamlLoader, build_timers};
pub use queue::DeferredFn;
pub use scheduler::{LifecycleState, QueueOptions, TimerError, TimerQueue, TimerService};
pub use timer::{TimerCallback, TimerHandle, TimerId, WeakTimerHandle};
