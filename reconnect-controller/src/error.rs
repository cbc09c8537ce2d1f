//! Error types for the reconnect controller.

use std::time::Duration;

/// Errors reported by the transport's reconnect operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Re-establishing the signaling connection failed
    #[error("Reconnect failed: {0}")]
    Reconnect(String),

    /// Tearing down the current connection failed
    #[error("Disconnect failed: {0}")]
    Disconnect(String),

    /// Joining the conference room again failed
    #[error("Rejoin failed: {0}")]
    Rejoin(String),

    /// The server refused the supplied credentials
    #[error("Credentials rejected: {0}")]
    CredentialsRejected(String),
}

/// Why a single recovery attempt did not succeed.
///
/// Every variant is turned into a retry or into exhaustion by the controller;
/// none of them escapes the event loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    /// A transport operation returned an error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Signaling reported a failure while the attempt was in flight
    #[error("Signaling failed during attempt: {0}")]
    SignalingFailed(String),

    /// Signaling dropped again after the attempt reconnected
    #[error("Signaling lost during attempt")]
    SignalingLost,

    /// The auth token expired while the attempt was in flight
    #[error("Credentials expired during attempt")]
    CredentialExpired,

    /// No signaling-established event arrived in time
    #[error("Attempt not confirmed within {0:?}")]
    TimedOut(Duration),

    /// The user left the call while the attempt was running
    #[error("Attempt abandoned: user is leaving")]
    Abandoned,

    /// A rejoin was requested but the host has no current room
    #[error("No conference room to rejoin")]
    MissingRoom,
}

impl RecoveryError {
    /// Whether the controller should stop instead of scheduling another attempt
    pub fn is_abandon(&self) -> bool {
        matches!(self, RecoveryError::Abandoned)
    }

    /// Whether the failure means the current auth token is no longer accepted
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            RecoveryError::CredentialExpired
                | RecoveryError::Transport(TransportError::CredentialsRejected(_))
        )
    }
}

/// Errors from constructing or talking to the controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The controller loop has stopped
    #[error("Controller channel has been closed")]
    ChannelClosed,
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
