//! Write-once, read-many result slot.
#[cfg(feature = "loom")]
use loom::sync::{Condvar, Mutex};

#[cfg(not(feature = "loom"))]
use std::sync::{Condvar, Mutex};

use crate::error::{ComputationError, Outcome};

enum Slot<T> {
    Empty,
    Ready(Outcome<T>),
    Taken,
}

/// A broadcast channel for the outcome of a single computation.
///
/// The first outcome published is kept, and any later publish is ignored. Readers block until an outcome is published.
pub(crate) struct Channel<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            ready: Condvar::new(),
        }
    }

    /// Publishes the outcome, waking every reader.
    ///
    /// Returns `false` if an outcome had already been published, in which case `outcome` is dropped.
    pub fn publish(&self, outcome: Outcome<T>) -> bool {
        let published = {
            let mut slot = self.slot.lock().unwrap();
            if matches!(*slot, Slot::Empty) {
                *slot = Slot::Ready(outcome);
                true
            } else {
                false
            }
        };

        self.ready.notify_all();
        published
    }

    /// Returns `true` if an outcome has been published.
    pub fn is_populated(&self) -> bool {
        !matches!(*self.slot.lock().unwrap(), Slot::Empty)
    }

    /// Blocks until an outcome has been published.
    pub fn wait(&self) {
        self.with_populated(|_| ())
    }

    /// Blocks until an outcome has been published, and returns a copy of it.
    pub fn read(&self) -> Outcome<T>
    where
        T: Clone,
    {
        self.with_populated(|slot| match slot {
            Slot::Ready(outcome) => outcome.clone(),
            Slot::Empty | Slot::Taken => Err(ComputationError::AlreadyInvoked),
        })
    }

    /// Returns a copy of the outcome if one has been published, without blocking.
    pub fn try_read(&self) -> Option<Outcome<T>>
    where
        T: Clone,
    {
        match &*self.slot.lock().unwrap() {
            Slot::Empty => None,
            Slot::Ready(outcome) => Some(outcome.clone()),
            Slot::Taken => Some(Err(ComputationError::AlreadyInvoked)),
        }
    }

    /// Blocks until an outcome has been published, and moves it out of the channel.
    ///
    /// Only usable when the caller is the sole reader: any later read observes `AlreadyInvoked`.
    pub fn take(&self) -> Outcome<T> {
        self.with_populated(|slot| match std::mem::replace(slot, Slot::Taken) {
            Slot::Ready(outcome) => outcome,
            Slot::Empty | Slot::Taken => Err(ComputationError::AlreadyInvoked),
        })
    }

    fn with_populated<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Slot<T>) -> R,
    {
        let mut slot = self.slot.lock().unwrap();
        while matches!(*slot, Slot::Empty) {
            slot = self.ready.wait(slot).unwrap();
        }

        f(&mut slot)
    }
}
