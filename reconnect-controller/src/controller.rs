//! The reconnection state machine.
//!
//! [`ReconnectController`] owns all recovery state and processes one input at
//! a time from a single channel: normalized connection events, lifecycle
//! notices from the host, and messages from its own timers and attempt tasks.
//! Nothing else mutates the state, so handlers never race each other; the
//! [`AttemptGuard`] covers the one thing that does outlive a handler, the
//! asynchronous recovery sequence.
//!
//! Callers talk to a running controller through a [`ControllerHandle`].

use std::sync::Arc;
use std::time::Duration;

use conn_events::{ConnectionEvent, ConnectionFailure, Dispatch, FailureKind};
use tokio::sync::{mpsc, watch};

use crate::config::{ReconnectConfig, RejoinStrategy};
use crate::error::{ControllerError, RecoveryError, Result};
use crate::flag::ManualLeaveFlag;
use crate::guard::AttemptGuard;
use crate::host::{
    AppHost, HostAction, LoaderId, NotificationId, RECONNECTING_MESSAGE_KEY, RELOADING_MESSAGE_KEY,
};
use crate::media::MediaNotices;
use crate::recovery::{run_attempt, RecoverySequence};
use crate::state::{RecoveryCause, RecoveryPhase, RecoverySnapshot, RecoveryState};
use crate::task::ScheduledTask;
use crate::transport::SessionTransport;

/// Everything the controller loop reacts to
#[derive(Debug)]
enum Input {
    Connection(ConnectionEvent),
    ConferenceJoined,
    ConferenceWillLeave,
    ManualLeave,
    TimerFired { generation: u64 },
    AttemptFailed { generation: u64, error: RecoveryError },
    ReloadDue,
    Shutdown,
}

/// Recovery indicator currently shown by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryUi {
    Hidden,
    Reconnecting,
    Reloading,
}

/// Cloneable handle for feeding a controller and watching its status.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inputs: mpsc::UnboundedSender<Input>,
    status: watch::Receiver<RecoverySnapshot>,
    manual_leave: ManualLeaveFlag,
}

impl ControllerHandle {
    /// Queue a normalized connection event
    pub fn dispatch(&self, event: ConnectionEvent) -> Result<()> {
        self.send(Input::Connection(event))
    }

    /// Sink suitable for the listener bridge.
    ///
    /// Events arriving after the controller stopped are dropped.
    pub fn dispatcher(&self) -> Dispatch {
        let inputs = self.inputs.clone();
        Arc::new(move |event: ConnectionEvent| {
            let name = event.name();
            if inputs.send(Input::Connection(event)).is_err() {
                tracing::debug!(event = name, "controller stopped, dropping connection event");
            }
        })
    }

    /// The conference was joined; counts as a successful recovery
    pub fn conference_joined(&self) -> Result<()> {
        self.send(Input::ConferenceJoined)
    }

    /// The conference is about to be left
    pub fn conference_will_leave(&self) -> Result<()> {
        self.send(Input::ConferenceWillLeave)
    }

    /// The user is ending the call.
    ///
    /// The shared flag is raised before the controller sees the input, so an
    /// attempt already running stops at its next step.
    pub fn manual_leave(&self) -> Result<()> {
        self.manual_leave.set();
        self.send(Input::ManualLeave)
    }

    /// Stop the controller loop, cancelling any timer or attempt
    pub fn shutdown(&self) -> Result<()> {
        self.send(Input::Shutdown)
    }

    /// Latest published snapshot
    pub fn status(&self) -> RecoverySnapshot {
        self.status.borrow().clone()
    }

    /// Whether automatic recovery is underway
    pub fn is_reconnecting(&self) -> bool {
        self.status.borrow().phase.is_recovering()
    }

    /// Receiver that is notified after every processed input
    pub fn subscribe(&self) -> watch::Receiver<RecoverySnapshot> {
        self.status.clone()
    }

    fn send(&self, input: Input) -> Result<()> {
        self.inputs
            .send(input)
            .map_err(|_| ControllerError::ChannelClosed)
    }
}

/// Hand a message from a timer or attempt back to the controller loop
fn send_input(inputs: &mpsc::WeakUnboundedSender<Input>, input: Input) {
    let delivered = inputs
        .upgrade()
        .map(|tx| tx.send(input).is_ok())
        .unwrap_or(false);
    if !delivered {
        tracing::trace!("controller gone, dropping scheduled input");
    }
}

/// Bounded-retry reconnection state machine for one call session.
pub struct ReconnectController {
    config: ReconnectConfig,
    transport: Arc<dyn SessionTransport>,
    host: Arc<dyn AppHost>,
    manual_leave: ManualLeaveFlag,
    guard: AttemptGuard,
    state: RecoveryState,
    /// Final timer armed on exhaustion; kept apart from the pending slot
    reload: Option<ScheduledTask>,
    reload_dispatched: bool,
    recovery_ui: RecoveryUi,
    media: MediaNotices,
    // Weak so the loop ends once every handle and dispatcher is gone
    inputs_tx: mpsc::WeakUnboundedSender<Input>,
    inputs_rx: mpsc::UnboundedReceiver<Input>,
    status_tx: watch::Sender<RecoverySnapshot>,
}

impl ReconnectController {
    /// Create a controller and the handle used to drive it.
    ///
    /// `manual_leave` is shared with the host so the user's intent is visible
    /// to in-flight attempts immediately.
    pub fn new(
        config: ReconnectConfig,
        transport: Arc<dyn SessionTransport>,
        host: Arc<dyn AppHost>,
        manual_leave: ManualLeaveFlag,
    ) -> Result<(Self, ControllerHandle)> {
        config.validate()?;

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let initial = RecoverySnapshot {
            is_manual_leave: manual_leave.is_set(),
            ..RecoverySnapshot::initial()
        };
        let (status_tx, status_rx) = watch::channel(initial);

        let handle = ControllerHandle {
            inputs: inputs_tx.clone(),
            status: status_rx,
            manual_leave: manual_leave.clone(),
        };

        let controller = Self {
            config,
            transport,
            host,
            manual_leave,
            guard: AttemptGuard::new(),
            state: RecoveryState::new(),
            reload: None,
            reload_dispatched: false,
            recovery_ui: RecoveryUi::Hidden,
            media: MediaNotices::default(),
            inputs_tx: inputs_tx.downgrade(),
            inputs_rx,
            status_tx,
        };

        Ok((controller, handle))
    }

    /// Process inputs until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            max_attempts = self.config.max_attempts,
            strategy = ?self.config.rejoin_strategy,
            "reconnect controller started"
        );

        while self.step().await {}

        self.shutdown_tasks();
        tracing::info!("reconnect controller stopped");
    }

    /// Wait for one input and process it.
    ///
    /// Returns `false` once the controller should stop.
    pub async fn step(&mut self) -> bool {
        let Some(input) = self.inputs_rx.recv().await else {
            tracing::debug!("all controller handles dropped");
            return false;
        };

        let keep_running = self.handle(input);
        self.publish();
        keep_running
    }

    /// Current state as a snapshot
    pub fn snapshot(&self) -> RecoverySnapshot {
        RecoverySnapshot {
            phase: self.state.phase,
            attempt_count: self.state.attempt_count,
            is_manual_leave: self.manual_leave.is_set(),
            has_pending_task: self.state.pending.is_some(),
            reload_scheduled: self.reload.is_some() || self.reload_dispatched,
        }
    }

    /// Whether a recovery sequence currently holds the guard
    pub fn attempt_in_flight(&self) -> bool {
        self.guard.is_held()
    }

    fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Connection(event) => self.on_connection_event(event),
            Input::ConferenceJoined => self.on_established("conference_joined"),
            Input::ConferenceWillLeave => self.on_conference_will_leave(),
            Input::ManualLeave => self.on_manual_leave(),
            Input::TimerFired { generation } => self.on_timer_fired(generation),
            Input::AttemptFailed { generation, error } => self.on_attempt_failed(generation, error),
            Input::ReloadDue => self.on_reload_due(),
            Input::Shutdown => {
                tracing::debug!("controller received shutdown");
                self.shutdown_tasks();
                return false;
            }
        }
        true
    }

    fn on_connection_event(&mut self, event: ConnectionEvent) {
        tracing::trace!(
            event = event.name(),
            signaling = event.is_signaling(),
            phase = %self.state.phase,
            "connection event"
        );

        match event {
            ConnectionEvent::SignalingEstablished => self.on_established("signaling_established"),
            ConnectionEvent::SignalingDisconnected { message } => self.on_signaling_lost(message),
            ConnectionEvent::SignalingFailed(failure) => match failure.kind() {
                FailureKind::CredentialExpired => self.on_credential_expired(),
                FailureKind::Other => self.on_signaling_failed(failure),
            },
            media_event => {
                if self.manual_leave.is_set() {
                    tracing::debug!(event = media_event.name(), "user is leaving, no media notice");
                    return;
                }
                self.media.apply(&media_event, self.host.as_ref());
            }
        }
    }

    fn on_established(&mut self, source: &'static str) {
        let phase = self.state.phase;
        if phase == RecoveryPhase::Exhausted {
            tracing::debug!(source, "reload already scheduled, ignoring");
            return;
        }

        if self.manual_leave.is_set() {
            tracing::debug!(source, "connection established, clearing manual leave");
            self.manual_leave.clear();
        }

        if phase.is_recovering() {
            tracing::info!(
                source,
                attempts = self.state.attempt_count,
                "connection recovered"
            );
        } else {
            tracing::debug!(source, "connection established");
        }

        self.state.enter_idle();
        self.hide_recovery_ui();
    }

    fn on_signaling_lost(&mut self, message: Option<String>) {
        if self.manual_leave.is_set() {
            tracing::debug!("signaling lost while user is leaving, not recovering");
            return;
        }

        match self.state.phase {
            RecoveryPhase::Idle => {
                tracing::info!(
                    message = message.as_deref().unwrap_or(""),
                    wait = ?self.config.initial_wait,
                    "signaling lost, waiting before first attempt"
                );
                self.state.cause = RecoveryCause::SignalingLost;
                self.arm_retry_timer(self.config.initial_wait);
            }
            RecoveryPhase::WaitingToRetry => {
                tracing::debug!("signaling lost while already waiting to retry");
            }
            RecoveryPhase::Attempting => match self.config.rejoin_strategy {
                RejoinStrategy::InPlace => {
                    self.fail_attempt(RecoveryError::SignalingLost);
                }
                RejoinStrategy::LeaveAndRejoin => {
                    // The attempt disconnects on purpose before rejoining
                    tracing::debug!(
                        attempt = self.state.attempt_count,
                        "signaling lost during rejoin, deferring to attempt outcome"
                    );
                }
            },
            RecoveryPhase::Exhausted => {
                tracing::debug!("signaling lost after exhaustion, reload pending");
            }
        }
    }

    fn on_signaling_failed(&mut self, failure: ConnectionFailure) {
        if self.manual_leave.is_set() {
            tracing::debug!(%failure, "signaling failed while user is leaving");
            return;
        }

        match self.state.phase {
            RecoveryPhase::Idle => {
                tracing::info!(%failure, "signaling failed, waiting before first attempt");
                self.state.cause = RecoveryCause::SignalingLost;
                self.arm_retry_timer(self.config.initial_wait);
            }
            RecoveryPhase::Attempting => {
                self.fail_attempt(RecoveryError::SignalingFailed(failure.to_string()));
            }
            RecoveryPhase::WaitingToRetry | RecoveryPhase::Exhausted => {
                tracing::debug!(%failure, phase = %self.state.phase, "signaling failed, already handled");
            }
        }
    }

    fn on_credential_expired(&mut self) {
        if self.manual_leave.is_set() {
            tracing::debug!("credentials expired while user is leaving");
            return;
        }

        match self.state.phase {
            RecoveryPhase::Idle | RecoveryPhase::WaitingToRetry => {
                self.state.cause = RecoveryCause::CredentialExpired;
                if self.config.immediate_on_credential_expiry {
                    tracing::info!("credentials expired, recovering immediately");
                    self.begin_attempt();
                } else if self.state.phase == RecoveryPhase::Idle {
                    tracing::info!("credentials expired, waiting before first attempt");
                    self.arm_retry_timer(self.config.initial_wait);
                }
            }
            RecoveryPhase::Attempting => {
                self.state.cause = RecoveryCause::CredentialExpired;
                self.fail_attempt(RecoveryError::CredentialExpired);
            }
            RecoveryPhase::Exhausted => {
                tracing::debug!("credentials expired after exhaustion, reload pending");
            }
        }
    }

    fn on_timer_fired(&mut self, generation: u64) {
        if !self.state.is_current(generation) || self.state.phase != RecoveryPhase::WaitingToRetry {
            tracing::debug!(generation, phase = %self.state.phase, "ignoring stale retry timer");
            return;
        }

        if self.manual_leave.is_set() {
            tracing::debug!("retry timer fired while user is leaving");
            self.state.enter_idle();
            self.hide_recovery_ui();
            return;
        }

        self.begin_attempt();
    }

    /// Start the next attempt, or defer it while the guard is still held
    fn begin_attempt(&mut self) {
        let Some(permit) = self.guard.try_acquire() else {
            tracing::warn!(
                attempt = self.state.attempt_count,
                "previous attempt still holds the guard, deferring"
            );
            self.arm_retry_timer(self.config.retry_delay);
            return;
        };

        self.state.attempt_count += 1;
        self.state.phase = RecoveryPhase::Attempting;
        let generation = self.state.next_generation();
        let attempt = self.state.attempt_count;

        tracing::info!(
            attempt,
            max_attempts = self.config.max_attempts,
            cause = ?self.state.cause,
            "starting recovery attempt"
        );
        self.show_reconnecting_ui();

        let sequence = RecoverySequence {
            transport: Arc::clone(&self.transport),
            host: Arc::clone(&self.host),
            manual_leave: self.manual_leave.clone(),
            strategy: self.config.rejoin_strategy,
            settle_delay: self.config.rejoin_settle_delay,
            cause: self.state.cause,
            attempt,
        };
        let inputs = self.inputs_tx.clone();
        let task = ScheduledTask::spawn(
            "recovery-attempt",
            run_attempt(sequence, permit, self.config.attempt_timeout, move |error| {
                send_input(&inputs, Input::AttemptFailed { generation, error });
            }),
        );
        self.state.replace_pending(task);
    }

    fn arm_retry_timer(&mut self, delay: Duration) {
        if self.manual_leave.is_set() {
            tracing::debug!("user is leaving, not arming retry timer");
            self.state.enter_idle();
            return;
        }

        let generation = self.state.next_generation();
        let inputs = self.inputs_tx.clone();
        let timer = ScheduledTask::after("retry-timer", delay, move || {
            send_input(&inputs, Input::TimerFired { generation });
        });
        self.state.replace_pending(timer);
        self.state.phase = RecoveryPhase::WaitingToRetry;

        tracing::debug!(
            ?delay,
            generation,
            attempt = self.state.attempt_count,
            "retry timer armed"
        );
    }

    /// Fail the running attempt from the controller side
    fn fail_attempt(&mut self, error: RecoveryError) {
        self.state.cancel_pending();
        self.after_failure(error);
    }

    fn on_attempt_failed(&mut self, generation: u64, error: RecoveryError) {
        if !self.state.is_current(generation) || self.state.phase != RecoveryPhase::Attempting {
            tracing::debug!(generation, %error, "ignoring outcome of superseded attempt");
            return;
        }

        self.state.pending = None;
        self.after_failure(error);
    }

    fn after_failure(&mut self, error: RecoveryError) {
        let attempt = self.state.attempt_count;

        if error.is_abandon() || self.manual_leave.is_set() {
            tracing::info!(attempt, "recovery abandoned, user is leaving");
            self.state.enter_idle();
            self.hide_recovery_ui();
            return;
        }

        if error.is_credential_rejection() && self.state.cause != RecoveryCause::CredentialExpired {
            tracing::info!(attempt, %error, "credentials rejected, clearing token before retry");
            self.state.cause = RecoveryCause::CredentialExpired;
        }

        if attempt >= self.config.max_attempts {
            self.exhaust(error);
            return;
        }

        tracing::warn!(
            attempt,
            max_attempts = self.config.max_attempts,
            %error,
            "recovery attempt failed, retrying"
        );
        self.arm_retry_timer(self.config.retry_delay);
    }

    fn exhaust(&mut self, error: RecoveryError) {
        self.state.cancel_pending();
        self.state.phase = RecoveryPhase::Exhausted;
        self.reload_dispatched = false;

        tracing::error!(
            attempts = self.state.attempt_count,
            %error,
            reload_in = ?self.config.reload_delay,
            "recovery attempts exhausted, scheduling reload"
        );
        self.show_reloading_ui();

        let inputs = self.inputs_tx.clone();
        let timer = ScheduledTask::after("reload-timer", self.config.reload_delay, move || {
            send_input(&inputs, Input::ReloadDue);
        });
        if let Some(previous) = self.reload.replace(timer) {
            previous.cancel();
        }
    }

    fn on_reload_due(&mut self) {
        if self.state.phase != RecoveryPhase::Exhausted || self.reload_dispatched {
            tracing::debug!(phase = %self.state.phase, "ignoring stale reload timer");
            return;
        }

        self.reload = None;
        self.reload_dispatched = true;
        tracing::info!("reloading client");
        self.host.dispatch(HostAction::Reload);
    }

    fn on_conference_will_leave(&mut self) {
        if self.state.phase == RecoveryPhase::Attempting {
            tracing::debug!("conference left by recovery attempt, not a manual leave");
            return;
        }
        self.on_manual_leave();
    }

    fn on_manual_leave(&mut self) {
        self.manual_leave.set();

        let phase = self.state.phase;
        self.state.enter_idle();
        if let Some(reload) = self.reload.take() {
            reload.cancel();
        }
        self.reload_dispatched = false;
        self.hide_recovery_ui();
        self.media.hide_all(self.host.as_ref());

        tracing::info!(from = %phase, "manual leave, automatic recovery suspended");
    }

    fn show_reconnecting_ui(&mut self) {
        if self.recovery_ui != RecoveryUi::Hidden {
            return;
        }
        self.host
            .dispatch(HostAction::ShowNotification(NotificationId::Reconnecting));
        self.host.dispatch(HostAction::ShowLoader {
            id: LoaderId::AutoReconnect,
            message_key: RECONNECTING_MESSAGE_KEY,
        });
        self.recovery_ui = RecoveryUi::Reconnecting;
    }

    fn show_reloading_ui(&mut self) {
        if self.recovery_ui == RecoveryUi::Reloading {
            return;
        }
        self.hide_recovery_ui();
        self.host.dispatch(HostAction::ShowLoader {
            id: LoaderId::Reload,
            message_key: RELOADING_MESSAGE_KEY,
        });
        self.recovery_ui = RecoveryUi::Reloading;
    }

    fn hide_recovery_ui(&mut self) {
        match self.recovery_ui {
            RecoveryUi::Hidden => {}
            RecoveryUi::Reconnecting => {
                self.host
                    .dispatch(HostAction::HideNotification(NotificationId::Reconnecting));
                self.host.dispatch(HostAction::HideLoader(LoaderId::AutoReconnect));
            }
            RecoveryUi::Reloading => {
                self.host.dispatch(HostAction::HideLoader(LoaderId::Reload));
            }
        }
        self.recovery_ui = RecoveryUi::Hidden;
    }

    fn shutdown_tasks(&mut self) {
        self.state.cancel_pending();
        if let Some(reload) = self.reload.take() {
            reload.cancel();
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::host::TrackRef;
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl SessionTransport for NullTransport {
        async fn reconnect(&self) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn disconnect(&self) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn rejoin(&self, _room_id: &str) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    struct NullHost;

    impl AppHost for NullHost {
        fn dispatch(&self, _action: HostAction) {}

        fn room_id(&self) -> Option<String> {
            None
        }

        fn remote_tracks(&self) -> Vec<TrackRef> {
            Vec::new()
        }
    }

    fn controller(config: ReconnectConfig) -> Result<(ReconnectController, ControllerHandle)> {
        ReconnectController::new(
            config,
            Arc::new(NullTransport),
            Arc::new(NullHost),
            ManualLeaveFlag::new(),
        )
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = controller(ReconnectConfig::default().with_max_attempts(0));
        assert!(matches!(result, Err(ControllerError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_initial_snapshot() {
        let (controller, handle) = controller(ReconnectConfig::default()).unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot, RecoverySnapshot::initial());
        assert_eq!(handle.status(), snapshot);
        assert!(!handle.is_reconnecting());
        assert!(!controller.attempt_in_flight());
    }

    #[tokio::test]
    async fn test_handle_reports_closed_channel() {
        let (controller, handle) = controller(ReconnectConfig::default()).unwrap();
        drop(controller);

        assert!(matches!(
            handle.dispatch(ConnectionEvent::SignalingEstablished),
            Err(ControllerError::ChannelClosed)
        ));
        // Dispatcher swallows the error
        (handle.dispatcher())(ConnectionEvent::MediaInterrupted);
    }

    #[tokio::test]
    async fn test_shutdown_stops_step() {
        let (mut controller, handle) = controller(ReconnectConfig::default()).unwrap();
        handle.shutdown().unwrap();
        assert!(!controller.step().await);
    }

    #[tokio::test]
    async fn test_step_ends_when_handles_dropped() {
        let (mut controller, handle) = controller(ReconnectConfig::default()).unwrap();
        drop(handle);
        assert!(!controller.step().await);
    }
}
