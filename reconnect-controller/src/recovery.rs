//! The ordered cleanup-then-reconnect sequence run by each attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RejoinStrategy;
use crate::error::RecoveryError;
use crate::flag::ManualLeaveFlag;
use crate::guard::AttemptPermit;
use crate::host::{AppHost, HostAction};
use crate::state::RecoveryCause;
use crate::transport::SessionTransport;

/// One recovery attempt's worth of work.
pub(crate) struct RecoverySequence {
    pub(crate) transport: Arc<dyn SessionTransport>,
    pub(crate) host: Arc<dyn AppHost>,
    pub(crate) manual_leave: ManualLeaveFlag,
    pub(crate) strategy: RejoinStrategy,
    pub(crate) settle_delay: Duration,
    pub(crate) cause: RecoveryCause,
    pub(crate) attempt: u32,
}

impl RecoverySequence {
    /// Discard stale state, then reconnect.
    ///
    /// Returns once the transport accepted the reconnect. The manual-leave flag
    /// is checked before every step that touches the transport.
    pub(crate) async fn run(&self) -> Result<(), RecoveryError> {
        self.checkpoint("cleanup")?;
        self.discard_stale_state();

        self.checkpoint("reconnect")?;
        match self.strategy {
            RejoinStrategy::InPlace => self.transport.reconnect().await?,
            RejoinStrategy::LeaveAndRejoin => self.leave_and_rejoin().await?,
        }

        tracing::debug!(attempt = self.attempt, "reconnect accepted by transport");
        Ok(())
    }

    fn checkpoint(&self, step: &'static str) -> Result<(), RecoveryError> {
        if self.manual_leave.is_set() {
            tracing::debug!(attempt = self.attempt, step, "user is leaving, abandoning attempt");
            return Err(RecoveryError::Abandoned);
        }
        Ok(())
    }

    fn discard_stale_state(&self) {
        let tracks = self.host.remote_tracks();
        tracing::debug!(
            attempt = self.attempt,
            tracks = tracks.len(),
            "discarding remote tracks"
        );
        for track in tracks {
            self.host.dispatch(HostAction::RemoveRemoteTrack(track));
        }

        if self.cause == RecoveryCause::CredentialExpired {
            tracing::debug!(attempt = self.attempt, "clearing expired auth token");
            self.host.dispatch(HostAction::ClearAuthToken);
        }
    }

    async fn leave_and_rejoin(&self) -> Result<(), RecoveryError> {
        let room_id = self.host.room_id().ok_or(RecoveryError::MissingRoom)?;

        // The old connection is usually already dead; a failed disconnect is expected
        if let Err(error) = self.transport.disconnect().await {
            tracing::debug!(attempt = self.attempt, %error, "disconnect failed, continuing");
        }

        tokio::time::sleep(self.settle_delay).await;

        self.checkpoint("reconnect")?;
        self.transport.reconnect().await?;

        self.checkpoint("rejoin")?;
        self.transport.rejoin(&room_id).await?;
        Ok(())
    }
}

/// Body of an attempt task.
///
/// Holds the guard permit until the outcome is known. The attempt can only end
/// successfully from the outside (the controller cancels the task when
/// signaling is established); every way of finishing on its own is a failure
/// handed to `report`.
pub(crate) async fn run_attempt<F>(
    sequence: RecoverySequence,
    permit: AttemptPermit,
    timeout: Duration,
    report: F,
) where
    F: FnOnce(RecoveryError) + Send,
{
    let deadline = Instant::now() + timeout;

    let error = match tokio::time::timeout_at(deadline, sequence.run()).await {
        Err(_) => RecoveryError::TimedOut(timeout),
        Ok(Err(error)) => error,
        Ok(Ok(())) => {
            tokio::time::sleep_until(deadline).await;
            RecoveryError::TimedOut(timeout)
        }
    };

    drop(permit);
    report(error);
}
