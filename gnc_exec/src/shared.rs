//! # Shared cells
//!
//! Every structure shared between the periodic tasks has a single producer and
//! one or more consumers running on other threads. A [`Shared`] cell guards
//! the value with a lock and only ever hands out copies, so a consumer always
//! sees a complete snapshot and never a partially written value.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use parking_lot::Mutex;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A lock-guarded value with copy-on-read semantics.
///
/// Cloning a `Shared` clones the handle, not the value.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<Mutex<T>>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Get a snapshot of the current value.
    pub fn get(&self) -> T {
        self.0.lock().clone()
    }

    /// Run `f` on a borrow of the value, for readers which only need part of
    /// a large value.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R
    {
        f(&*self.0.lock())
    }

    /// Replace the current value.
    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    /// Modify the value in place while holding the lock, so that the
    /// modification is seen by readers either entirely or not at all.
    ///
    /// Returns whatever `f` returns, which lets a check and a write happen
    /// under the same lock.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R
    {
        f(&mut *self.0.lock())
    }
}
