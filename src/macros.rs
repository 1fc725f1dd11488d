#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut state = lock!(self.state);
///  *state = InitState::Ready;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for waiting on a condition variable with a locked guard
///
/// ```rust, ignore
///  state = wait!(self.ready, state);
/// ```
macro_rules! wait {
    ($condvar:expr, $guard:expr) => {
        $condvar.wait($guard).expect("Failed to wait on condition")
    };
}

/// Helper macro for fetching an arena entry that is known to exist
///
/// Ids are only handed out after the entry has been pushed, so a miss is an internal invariant
/// violation (an id from another host).
///
/// ```rust, ignore
///  let entry = arena_get!(self.types, id.index(), "type");
/// ```
macro_rules! arena_get {
    ($arena:expr, $index:expr, $kind:literal) => {
        $arena
            .get($index)
            .unwrap_or_else(|| panic!(concat!("unknown ", $kind, " id {}"), $index))
    };
}
