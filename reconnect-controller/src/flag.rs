//! Manual-leave flag shared between the host UI and the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Records whether the user is intentionally leaving the call.
///
/// Cloning yields another handle to the same flag. The host sets it when the
/// user hangs up; the controller reads it before every recovery step and clears
/// it once signaling is established again.
#[derive(Debug, Clone, Default)]
pub struct ManualLeaveFlag {
    leaving: Arc<AtomicBool>,
}

impl ManualLeaveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the user as leaving
    pub fn set(&self) {
        self.leaving.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.leaving.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.leaving.load(Ordering::SeqCst)
    }
}
