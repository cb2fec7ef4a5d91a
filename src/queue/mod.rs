//! Command queue between producer threads and the timer worker.

mod command;
mod mailbox;

pub use command::DeferredFn;

pub(crate) use command::{PendingCall, TimerCommand};
pub(crate) use mailbox::Mailbox;
