//! Mailbox shared between producers and the worker.
//!
//! Producers append under a short critical section and signal the condition;
//! the worker takes the whole batch at once and processes it after releasing
//! the lock, so producers are never blocked by a running callback.

use std::mem;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use super::command::TimerCommand;

/// Multi-producer, single-consumer command mailbox.
#[derive(Debug, Default)]
pub(crate) struct Mailbox {
    commands: Mutex<Vec<TimerCommand>>,
    ready: Condvar,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TimerCommand>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a command, waiting for the lock if needed.
    pub(crate) fn send(&self, command: TimerCommand) {
        self.lock().push(command);
        self.ready.notify_one();
    }

    /// Append a command only if the lock is free right now.
    ///
    /// On contention the command is handed back and nothing is enqueued.
    pub(crate) fn try_send(&self, command: TimerCommand) -> Result<(), TimerCommand> {
        let mut commands = match self.commands.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(command),
        };
        commands.push(command);
        drop(commands);

        self.ready.notify_one();
        Ok(())
    }

    /// Take every queued command.
    ///
    /// When the mailbox is empty and `wait` is `Some`, blocks until a command
    /// arrives or the duration elapses. `None` never waits.
    pub(crate) fn recv_batch(&self, wait: Option<Duration>) -> Vec<TimerCommand> {
        let mut commands = self.lock();
        let wait = wait.filter(|timeout| !timeout.is_zero() && commands.is_empty());
        if let Some(timeout) = wait {
            commands = self
                .ready
                .wait_timeout_while(commands, timeout, |queued| queued.is_empty())
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        mem::take(&mut *commands)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn hold(&self) -> MutexGuard<'_, Vec<TimerCommand>> {
        self.lock()
    }
}
