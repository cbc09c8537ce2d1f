//! Raw transport signals and the subscription seam.
//!
//! The media/signaling library is a black box that exposes named signals and
//! add/remove listener operations. This module models that surface so the
//! bridge can subscribe without knowing anything about the concrete library.

use std::fmt;
use std::sync::Arc;

/// Signals emitted by the signaling connection (the control channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingSignal {
    /// The signaling connection was established
    Established,
    /// The signaling connection dropped
    Disconnected,
    /// The signaling connection failed with an error
    Failed,
}

impl SignalingSignal {
    /// All signaling signals the bridge subscribes to
    pub const ALL: [SignalingSignal; 3] = [
        SignalingSignal::Established,
        SignalingSignal::Disconnected,
        SignalingSignal::Failed,
    ];
}

/// Signals emitted by the conference media path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSignal {
    /// ICE/media connectivity was interrupted
    Interrupted,
    /// ICE/media connectivity came back
    Restored,
    /// The local device was suspended (sleep, lid closed)
    DeviceSuspended,
}

impl MediaSignal {
    /// All media signals the bridge subscribes to
    pub const ALL: [MediaSignal; 3] = [
        MediaSignal::Interrupted,
        MediaSignal::Restored,
        MediaSignal::DeviceSuspended,
    ];
}

/// Payload carried by a raw signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalPayload {
    /// No payload
    Empty,
    /// A human readable message (disconnect reason)
    Message(String),
    /// A failure with a machine readable reason and optional message
    Failure {
        reason: String,
        message: Option<String>,
    },
}

/// Listener callback registered on an [`EventTarget`].
pub type SignalHandler = Arc<dyn Fn(SignalPayload) + Send + Sync>;

/// Opaque handle returned by [`EventTarget::add_listener`].
///
/// Removing a listener requires the exact handle obtained when it was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    /// Create a handle from a raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id of this handle
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A transport object that emits signals of type `S`.
///
/// Implemented by adapters over the real media library. [`crate::Emitter`]
/// is an in-process implementation used by tests and simple hosts.
pub trait EventTarget<S>: Send + Sync {
    /// Register `handler` for `signal`, returning the handle needed to remove it
    fn add_listener(&self, signal: S, handler: SignalHandler) -> ListenerHandle;

    /// Remove a listener previously registered for `signal`
    ///
    /// Returns `false` if no listener with that handle was registered.
    fn remove_listener(&self, signal: S, handle: ListenerHandle) -> bool;
}
