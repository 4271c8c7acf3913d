//! Lock helpers.
//!
//! A panic while a lock is held poisons it; the guarded state of this crate (resolver lists,
//! universe state) stays consistent across such panics, so poisoned locks are entered anyway.
#![allow(unused_macros)]

/// Takes the read side of an `RwLock`, ignoring poisoning.
///
/// ```rust, ignore
/// let resolvers = read_lock!(provider.resolvers);
/// tracing::trace!(count = resolvers.len(), "resolvers");
/// ```
macro_rules! read_lock {
    ($lock:expr) => {
        $lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Takes the write side of an `RwLock`, ignoring poisoning.
///
/// ```rust, ignore
/// let mut state = write_lock!(universe.state);
/// state.disposed = true;
/// ```
macro_rules! write_lock {
    ($lock:expr) => {
        $lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
