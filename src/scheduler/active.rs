//! Ordered list of armed timers, owned by the worker.

use std::time::Instant;

use crate::timer::{TimerHandle, TimerId};

struct ActiveEntry {
    deadline: Instant,
    timer: TimerHandle,
}

/// Armed timers sorted ascending by deadline.
#[derive(Default)]
pub(crate) struct ActiveTimers {
    entries: Vec<ActiveEntry>,
}

impl ActiveTimers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: TimerId) -> Option<usize> {
        self.entries.iter().position(|e| e.timer.id() == id)
    }

    /// Deadline of the head timer.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.deadline)
    }

    /// Arm `timer` at `now + period`. Returns `true` if it was newly inserted.
    ///
    /// Leaves the list unsorted; callers sort once per batch.
    pub(crate) fn arm(&mut self, timer: TimerHandle, now: Instant) -> bool {
        let deadline = now + timer.period();
        timer.set_next_trigger(Some(deadline));
        timer.set_active(true);

        match self.position(timer.id()) {
            Some(idx) => {
                self.entries[idx].deadline = deadline;
                false
            }
            None => {
                self.entries.push(ActiveEntry { deadline, timer });
                true
            }
        }
    }

    /// Remove a timer. Returns `true` if it was present.
    pub(crate) fn disarm(&mut self, id: TimerId) -> bool {
        match self.position(id) {
            Some(idx) => {
                let entry = self.entries.remove(idx);
                entry.timer.set_active(false);
                true
            }
            None => false,
        }
    }

    pub(crate) fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.deadline);
    }

    /// Advance or retire every timer due at `now` and return them in firing order.
    ///
    /// Each timer is visited at most once per call. Repeating timers keep their
    /// cadence by adding the period to the previous deadline.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<TimerHandle> {
        let mut due = Vec::new();
        let mut idx = 0;

        while idx < self.entries.len() && self.entries[idx].deadline <= now {
            let entry = &mut self.entries[idx];
            if entry.timer.repeats() {
                entry.deadline += entry.timer.period();
                entry.timer.set_next_trigger(Some(entry.deadline));
                due.push(entry.timer.clone());
                idx += 1;
            } else {
                let entry = self.entries.remove(idx);
                entry.timer.set_active(false);
                entry.timer.set_next_trigger(None);
                due.push(entry.timer);
            }
        }

        if !due.is_empty() {
            self.sort();
        }
        due
    }

    /// Deactivate and drop every entry.
    pub(crate) fn clear(&mut self) {
        for entry in self.entries.drain(..) {
            entry.timer.set_active(false);
        }
    }

    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<TimerId> {
        self.entries.iter().map(|e| e.timer.id()).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].deadline <= w[1].deadline)
    }
}
