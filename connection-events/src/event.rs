//! Normalized connection events.
//!
//! The bridge converts raw [`crate::SignalPayload`]s into this small event set
//! before handing them to whoever consumes them (the reconnect controller).

use std::fmt;
use std::sync::Arc;

/// Failure reason reported by the signaling library when the auth token expired.
pub const CREDENTIAL_EXPIRED_REASON: &str = "connection.passwordRequired";

/// Classification of a signaling failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The auth token expired; the cause is known and retrying with fresh credentials is safe
    CredentialExpired,
    /// Anything else (network loss, server error)
    Other,
}

/// A signaling failure as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFailure {
    /// Machine readable reason, e.g. `connection.passwordRequired`
    pub reason: String,
    /// Optional human readable detail
    pub message: Option<String>,
}

impl ConnectionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Failure caused by an expired auth token
    pub fn credential_expired() -> Self {
        Self::new(CREDENTIAL_EXPIRED_REASON)
    }

    pub fn kind(&self) -> FailureKind {
        if self.reason == CREDENTIAL_EXPIRED_REASON {
            FailureKind::CredentialExpired
        } else {
            FailureKind::Other
        }
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({})", self.reason, message),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Connection events after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Signaling connection is up
    SignalingEstablished,
    /// Signaling connection dropped
    SignalingDisconnected { message: Option<String> },
    /// Signaling connection failed
    SignalingFailed(ConnectionFailure),
    /// Media path interrupted while signaling may still be up
    MediaInterrupted,
    /// Media path restored; `after_interruption` is false when no interruption
    /// had been observed since the listeners were attached
    MediaRestored { after_interruption: bool },
    /// Local device suspension detected
    DeviceSuspended,
}

impl ConnectionEvent {
    /// Short name used in log fields
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::SignalingEstablished => "signaling_established",
            ConnectionEvent::SignalingDisconnected { .. } => "signaling_disconnected",
            ConnectionEvent::SignalingFailed(_) => "signaling_failed",
            ConnectionEvent::MediaInterrupted => "media_interrupted",
            ConnectionEvent::MediaRestored { .. } => "media_restored",
            ConnectionEvent::DeviceSuspended => "device_suspended",
        }
    }

    /// Whether this event concerns the signaling connection
    pub fn is_signaling(&self) -> bool {
        matches!(
            self,
            ConnectionEvent::SignalingEstablished
                | ConnectionEvent::SignalingDisconnected { .. }
                | ConnectionEvent::SignalingFailed(_)
        )
    }
}

/// Sink the bridge forwards normalized events into.
pub type Dispatch = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;
