//! Call session facade.
//!
//! A [`CallSession`] ties together the pieces one call needs: the listener
//! bridge state for the current signaling and media sources, and a
//! reconnect controller running on its own task.

use std::sync::Arc;

use conn_events::{
    attach_media_listeners, attach_signaling_listeners, detach_media_listeners,
    detach_signaling_listeners, AttachOutcome, ConnectionState, DetachOutcome, Dispatch,
    EventTarget, MediaSignal, SignalingSignal,
};
use reconnect_controller::{
    AppHost, ControllerHandle, ManualLeaveFlag, ReconnectConfig, ReconnectController,
    RecoverySnapshot, SessionTransport,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Result, SessionError};

/// Builder for [`CallSession`].
///
/// A transport and a host are required; everything else has a default.
#[derive(Default)]
pub struct CallSessionBuilder {
    config: ReconnectConfig,
    transport: Option<Arc<dyn SessionTransport>>,
    host: Option<Arc<dyn AppHost>>,
    manual_leave: Option<ManualLeaveFlag>,
    signaling: Option<Arc<dyn EventTarget<SignalingSignal>>>,
    media: Option<Arc<dyn EventTarget<MediaSignal>>>,
}

impl CallSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ReconnectConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn SessionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn AppHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Share an existing manual-leave flag with the host UI
    pub fn with_manual_leave_flag(mut self, flag: ManualLeaveFlag) -> Self {
        self.manual_leave = Some(flag);
        self
    }

    /// Signaling connection whose signals drive recovery
    pub fn with_signaling_source(mut self, source: Arc<dyn EventTarget<SignalingSignal>>) -> Self {
        self.signaling = Some(source);
        self
    }

    /// Conference media path whose signals drive status notices
    pub fn with_media_source(mut self, source: Arc<dyn EventTarget<MediaSignal>>) -> Self {
        self.media = Some(source);
        self
    }

    /// Spawn the controller and attach listeners to the configured sources.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<CallSession> {
        let transport = self.transport.ok_or(SessionError::MissingTransport)?;
        let host = self.host.ok_or(SessionError::MissingHost)?;
        let manual_leave = self.manual_leave.unwrap_or_default();

        let (controller, handle) =
            ReconnectController::new(self.config, transport, host, manual_leave)?;
        let worker = tokio::spawn(controller.run());

        let dispatch = handle.dispatcher();
        let mut connection = ConnectionState::new();
        attach_signaling_listeners(self.signaling.as_ref(), &dispatch, &mut connection);
        attach_media_listeners(self.media.as_ref(), &dispatch, &mut connection);

        tracing::info!(
            signaling = connection.has_signaling_listeners(),
            media = connection.has_media_listeners(),
            "call session started"
        );

        Ok(CallSession {
            connection,
            dispatch,
            handle,
            worker: Some(worker),
        })
    }
}

/// One active call with automatic connection recovery.
///
/// Dropping the session detaches its listeners and stops the controller;
/// [`CallSession::end`] does the same and waits for the controller to finish.
pub struct CallSession {
    connection: ConnectionState,
    dispatch: Dispatch,
    handle: ControllerHandle,
    worker: Option<JoinHandle<()>>,
}

impl CallSession {
    pub fn builder() -> CallSessionBuilder {
        CallSessionBuilder::new()
    }

    /// Swap the media source, detaching from the old one first.
    ///
    /// `None` only detaches.
    pub fn replace_media_source(
        &mut self,
        source: Option<Arc<dyn EventTarget<MediaSignal>>>,
    ) -> AttachOutcome {
        detach_media_listeners(&mut self.connection);
        attach_media_listeners(source.as_ref(), &self.dispatch, &mut self.connection)
    }

    /// Swap the signaling source, detaching from the old one first.
    ///
    /// `None` only detaches.
    pub fn replace_signaling_source(
        &mut self,
        source: Option<Arc<dyn EventTarget<SignalingSignal>>>,
    ) -> AttachOutcome {
        detach_signaling_listeners(&mut self.connection);
        attach_signaling_listeners(source.as_ref(), &self.dispatch, &mut self.connection)
    }

    /// The user is hanging up; cancels any recovery in progress
    pub fn leave(&self) -> Result<()> {
        tracing::debug!("user leaving call");
        Ok(self.handle.manual_leave()?)
    }

    /// Forward the conference-joined lifecycle notice
    pub fn conference_joined(&self) -> Result<()> {
        Ok(self.handle.conference_joined()?)
    }

    /// Forward the conference-will-leave lifecycle notice
    pub fn conference_will_leave(&self) -> Result<()> {
        Ok(self.handle.conference_will_leave()?)
    }

    pub fn status(&self) -> RecoverySnapshot {
        self.handle.status()
    }

    /// Receiver updated after every input the controller processes
    pub fn watch_status(&self) -> watch::Receiver<RecoverySnapshot> {
        self.handle.subscribe()
    }

    pub fn is_reconnecting(&self) -> bool {
        self.handle.is_reconnecting()
    }

    /// Controller handle, for feeding events from sources outside the bridge
    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Detach listeners, stop the controller and wait for it to exit
    pub async fn end(mut self) -> Result<()> {
        self.detach_all();

        let Some(worker) = self.worker.take() else {
            return Err(SessionError::Ended);
        };
        if self.handle.shutdown().is_err() {
            tracing::debug!("controller already stopped");
        }

        worker
            .await
            .map_err(|e| SessionError::WorkerJoin(e.to_string()))?;
        tracing::info!("call session ended");
        Ok(())
    }

    fn detach_all(&mut self) {
        let media = detach_media_listeners(&mut self.connection);
        let signaling = detach_signaling_listeners(&mut self.connection);
        if media == DetachOutcome::TargetGone || signaling == DetachOutcome::TargetGone {
            tracing::debug!(?media, ?signaling, "source dropped before session end");
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if self.worker.take().is_some() {
            self.detach_all();
            if self.handle.shutdown().is_err() {
                tracing::trace!("controller already stopped");
            }
        }
    }
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("connection", &self.connection)
            .field("status", &self.handle.status())
            .field("running", &self.worker.is_some())
            .finish()
    }
}
