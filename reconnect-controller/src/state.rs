//! Recovery state owned by one controller instance.

use std::fmt;

use crate::task::ScheduledTask;

/// Phase of the recovery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryPhase {
    /// Connected, or deliberately not recovering
    Idle,
    /// A timer is armed; the next attempt starts when it fires
    WaitingToRetry,
    /// An attempt holds the guard and is running or awaiting confirmation
    Attempting,
    /// Attempts ran out; a reload is scheduled
    Exhausted,
}

impl RecoveryPhase {
    /// Whether automatic recovery is underway
    pub fn is_recovering(&self) -> bool {
        matches!(self, RecoveryPhase::WaitingToRetry | RecoveryPhase::Attempting)
    }
}

impl fmt::Display for RecoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryPhase::Idle => "idle",
            RecoveryPhase::WaitingToRetry => "waiting_to_retry",
            RecoveryPhase::Attempting => "attempting",
            RecoveryPhase::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// What triggered the current recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCause {
    /// Ambiguous signaling loss (network drop, server restart)
    SignalingLost,
    /// Diagnosed credential expiry; stale credentials are cleared before retrying
    CredentialExpired,
}

/// Point-in-time view of the controller, published after every input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverySnapshot {
    pub phase: RecoveryPhase,
    pub attempt_count: u32,
    pub is_manual_leave: bool,
    /// A timer or attempt task occupies the pending slot
    pub has_pending_task: bool,
    /// The final reload timer is armed or has fired
    pub reload_scheduled: bool,
}

impl RecoverySnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            phase: RecoveryPhase::Idle,
            attempt_count: 0,
            is_manual_leave: false,
            has_pending_task: false,
            reload_scheduled: false,
        }
    }
}

/// Mutable recovery bookkeeping.
///
/// `pending` is the single outstanding timer or attempt; it is only occupied
/// in `WaitingToRetry` and `Attempting`.
#[derive(Debug)]
pub(crate) struct RecoveryState {
    pub(crate) phase: RecoveryPhase,
    pub(crate) attempt_count: u32,
    pub(crate) cause: RecoveryCause,
    pub(crate) pending: Option<ScheduledTask>,
    /// Bumped whenever `pending` is replaced so late messages from an old
    /// timer or attempt can be recognized and dropped
    pub(crate) generation: u64,
}

impl RecoveryState {
    pub(crate) fn new() -> Self {
        Self {
            phase: RecoveryPhase::Idle,
            attempt_count: 0,
            cause: RecoveryCause::SignalingLost,
            pending: None,
            generation: 0,
        }
    }

    /// Cancel whatever occupies the pending slot
    pub(crate) fn cancel_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
    }

    /// Install a new pending task, cancelling the previous one
    pub(crate) fn replace_pending(&mut self, task: ScheduledTask) {
        self.cancel_pending();
        self.pending = Some(task);
    }

    /// Start a new generation for the next pending task
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Leave recovery: no pending task, attempt count back to zero
    pub(crate) fn enter_idle(&mut self) {
        self.cancel_pending();
        self.phase = RecoveryPhase::Idle;
        self.attempt_count = 0;
        self.cause = RecoveryCause::SignalingLost;
    }
}
