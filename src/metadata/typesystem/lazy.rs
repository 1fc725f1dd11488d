//! One-time initialization with an explicit state machine.
//!
//! [`InitOnce`] backs every lazily populated cache of the type graph: the member tables of
//! generic instances and specialized nested types, their base classes and their interfaces.
//!
//! # States
//!
//! - **Uninitialized**: nobody has asked yet, or a previous initializer panicked
//! - **Initializing(thread)**: `thread` is running the initializer; other threads wait on a
//!   condition variable
//! - **Ready**: the value is published; reads go through a lock-free [`OnceLock`] fast path
//!
//! Population of one cache may (through a cyclic type graph) ask for the very same cache again.
//! Instead of deadlocking, the re-entrant request from the initializing thread observes `None`
//! and the caller degrades to an empty result.

use std::{
    sync::{Condvar, Mutex, OnceLock},
    thread::{self, ThreadId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Initializing(ThreadId),
    Ready,
}

/// A value that is computed exactly once, on first access.
#[derive(Debug)]
pub struct InitOnce<T> {
    value: OnceLock<T>,
    state: Mutex<InitState>,
    ready: Condvar,
}

impl<T> Default for InitOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resets the state if the initializer unwinds, so a later caller can retry.
struct ResetOnUnwind<'a, T> {
    cell: &'a InitOnce<T>,
    armed: bool,
}

impl<T> Drop for ResetOnUnwind<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut state) = self.cell.state.lock() {
                *state = InitState::Uninitialized;
            }
            self.cell.ready.notify_all();
        }
    }
}

impl<T> InitOnce<T> {
    /// Creates an uninitialized cell.
    #[must_use]
    pub fn new() -> Self {
        InitOnce {
            value: OnceLock::new(),
            state: Mutex::new(InitState::Uninitialized),
            ready: Condvar::new(),
        }
    }

    /// Returns the value if it has been initialized.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns true once the value has been published.
    pub fn is_ready(&self) -> bool {
        self.value.get().is_some()
    }

    /// Returns the value, running `init` first if nobody has done so yet.
    ///
    /// Concurrent callers block until the initializing thread has published the value. Returns
    /// `None` only when called again, from within `init`, by the initializing thread itself.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Option<&T> {
        if let Some(value) = self.value.get() {
            return Some(value);
        }

        let me = thread::current().id();
        {
            let mut state = lock!(self.state);
            loop {
                match *state {
                    InitState::Ready => return self.value.get(),
                    InitState::Initializing(owner) if owner == me => return None,
                    InitState::Initializing(_) => state = wait!(self.ready, state),
                    InitState::Uninitialized => {
                        *state = InitState::Initializing(me);
                        break;
                    }
                }
            }
        }

        let mut guard = ResetOnUnwind {
            cell: self,
            armed: true,
        };
        let computed = init();
        let _ = self.value.set(computed);
        guard.armed = false;

        *lock!(self.state) = InitState::Ready;
        self.ready.notify_all();

        self.value.get()
    }
}
