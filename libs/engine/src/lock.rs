//! Engine-wide execution lock
//!
//! One lock serializes every mutating operation across all pools. Threads
//! other than the holder block until it is released. The holder's own thread
//! re-entering (a callback calling back into the engine) is rejected with
//! [`EngineError::Reentrancy`] instead of deadlocking.

use crate::errors::EngineError;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

#[derive(Debug, Default)]
pub struct ExecutionLock {
    // `true` while an operation is running on the owning thread
    held: ReentrantMutex<Cell<bool>>,
}

/// RAII guard, releases the lock on drop
#[derive(Debug)]
pub struct LockGuard<'a> {
    guard: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl ExecutionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> Result<LockGuard<'_>, EngineError> {
        let guard = self.held.lock();
        if guard.get() {
            return Err(EngineError::Reentrancy);
        }
        guard.set(true);
        Ok(LockGuard { guard })
    }

    /// Whether an operation is in progress on any thread
    pub fn is_locked(&self) -> bool {
        match self.held.try_lock() {
            Some(guard) => guard.get(),
            None => true,
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.guard.set(false);
    }
}
