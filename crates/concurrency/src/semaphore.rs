//! Counting semaphore
//!
//! Permits are RAII guards: dropping a `SemaphorePermit` returns it, so a
//! permit moved into a task is released however the task ends. Permits own
//! a reference to the semaphore and may outlive the `Semaphore` handle they
//! were acquired from.

use crate::abort::AbortSignal;
use crate::ABORT_POLL_INTERVAL;
use ltrank_core::{LtrError, LtrResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

struct SemaphoreInner {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// Counting semaphore with abortable acquisition
///
/// Cloning yields another handle to the same permits.
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreInner>,
}

impl Semaphore {
    /// Create a semaphore with `permits` permits
    pub fn new(permits: usize) -> Self {
        Semaphore {
            inner: Arc::new(SemaphoreInner {
                available: Mutex::new(permits),
                released: Condvar::new(),
                capacity: permits,
            }),
        }
    }

    /// Block until a permit is available
    ///
    /// # Errors
    ///
    /// `Interrupted` if `abort` fires before a permit is obtained.
    pub fn acquire(&self, abort: &AbortSignal) -> LtrResult<SemaphorePermit> {
        let mut available = self.inner.available.lock();
        loop {
            if abort.is_aborted() {
                return Err(LtrError::Interrupted);
            }
            if *available > 0 {
                *available -= 1;
                return Ok(SemaphorePermit {
                    inner: Arc::clone(&self.inner),
                });
            }
            self.inner
                .released
                .wait_for(&mut available, ABORT_POLL_INTERVAL);
        }
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        let mut available = self.inner.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(SemaphorePermit {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Permits not currently held
    pub fn available_permits(&self) -> usize {
        *self.inner.available.lock()
    }

    /// Total number of permits
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("available", &self.available_permits())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// A held permit, released on drop
#[must_use = "dropping a permit releases it immediately"]
pub struct SemaphorePermit {
    inner: Arc<SemaphoreInner>,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        let mut available = self.inner.available.lock();
        *available += 1;
        self.inner.released.notify_one();
    }
}

impl std::fmt::Debug for SemaphorePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemaphorePermit").finish()
    }
}
