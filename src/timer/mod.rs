//! Timer handles.
//!
//! Handles are created by the caller and passed to a timer queue by reference;
//! the queue only reads and writes their scheduling fields.

mod handle;

pub use handle::{TimerCallback, TimerHandle, TimerId, WeakTimerHandle};
