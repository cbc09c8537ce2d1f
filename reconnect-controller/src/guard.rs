//! Single-attempt guard.
//!
//! The controller starts a recovery attempt only while holding an
//! [`AttemptPermit`]. The permit travels into the attempt task and is released
//! when that task finishes or is cancelled, so "at most one attempt in flight"
//! is enforced by ownership rather than by a flag every call site must check.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Mutual-exclusion guard for recovery attempts.
#[derive(Debug, Clone)]
pub struct AttemptGuard {
    semaphore: Arc<Semaphore>,
}

/// Proof that the holder is the only running recovery attempt.
///
/// Dropping the permit releases the guard.
#[derive(Debug)]
pub struct AttemptPermit {
    _permit: OwnedSemaphorePermit,
}

impl AttemptGuard {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Acquire the guard, or `None` if an attempt already holds it
    pub fn try_acquire(&self) -> Option<AttemptPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| AttemptPermit { _permit: permit })
    }

    /// Whether an attempt currently holds the guard
    pub fn is_held(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for AttemptGuard {
    fn default() -> Self {
        Self::new()
    }
}
