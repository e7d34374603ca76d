// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock + condition-variable transaction engine.
// Every channel owns one `Waiter` guarding all of its shared state, so a
// check of the closed flag and a queue mutation always run as one step.

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Default number of yield-and-retry rounds before parking on the condvar.
pub const SPIN_COUNT: u32 = 32;

/// Outcome of one run of a transaction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// Commit and return the value.
    Done(T),
    /// Nothing to do with the current state; run again once it changes.
    Retry,
}

/// Shared state guarded by a mutex, plus a condition variable used to
/// suspend transactions that asked to [`Step::Retry`].
///
/// Every body passed to [`Waiter::atomically`] or [`Waiter::with`] sees the
/// state exclusively, so any number of reads and writes inside it are
/// indivisible with respect to every other transaction on the same waiter.
pub struct Waiter<S> {
    state: Mutex<S>,
    cond: Condvar,
    spin_count: u32,
}

impl<S> Waiter<S> {
    /// Wrap `state` with the default spin count.
    pub const fn new(state: S) -> Self {
        Self::with_spin_count(state, SPIN_COUNT)
    }

    /// Wrap `state`, yielding up to `spin_count` times on retry before
    /// parking the calling thread.
    pub const fn with_spin_count(state: S, spin_count: u32) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
            spin_count,
        }
    }

    /// Run `body` atomically, re-running it after the state changes for as
    /// long as it returns [`Step::Retry`].
    ///
    /// Mirrors the spin-then-wait pattern of a blocking receive: a few
    /// cheap yields with the lock released, then a condvar wait that only
    /// a [`broadcast`](Self::broadcast) releases.
    pub fn atomically<T, F>(&self, mut body: F) -> T
    where
        F: FnMut(&mut S) -> Step<T>,
    {
        let mut k = 0u32;
        let mut guard = self.state.lock();
        loop {
            match body(&mut guard) {
                Step::Done(value) => return value,
                Step::Retry if k < self.spin_count => {
                    k += 1;
                    MutexGuard::unlocked(&mut guard, std::thread::yield_now);
                }
                Step::Retry => {
                    // The mutex is released and re-acquired around the wait,
                    // so a writer that commits after our check cannot slip
                    // its broadcast in before we are parked.
                    self.cond.wait(&mut guard);
                }
            }
        }
    }

    /// Run `body` atomically once. Never suspends.
    pub fn with<T, F>(&self, body: F) -> T
    where
        F: FnOnce(&mut S) -> T,
    {
        let mut guard = self.state.lock();
        body(&mut guard)
    }

    /// Wake every suspended transaction. Returns the number woken.
    pub fn broadcast(&self) -> usize {
        self.cond.notify_all()
    }

    /// Number of yield rounds before parking.
    pub fn spin_count(&self) -> u32 {
        self.spin_count
    }
}

impl<S: Default> Default for Waiter<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> std::fmt::Debug for Waiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("spin_count", &self.spin_count)
            .finish_non_exhaustive()
    }
}
