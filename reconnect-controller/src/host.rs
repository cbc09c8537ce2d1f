//! Interfaces to the surrounding application.
//!
//! The controller never renders anything or touches credential storage itself;
//! it reads a little application state and dispatches [`HostAction`]s that the
//! host maps onto its UI store.

use std::fmt;

/// Message key shown by the reconnecting loader
pub const RECONNECTING_MESSAGE_KEY: &str = "connection.reconnecting";

/// Message key shown by the reloading loader
pub const RELOADING_MESSAGE_KEY: &str = "connection.reloading";

/// Notifications the controller can show or hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationId {
    /// Automatic recovery is in progress
    Reconnecting,
    /// The media path was interrupted
    MediaInterrupted,
    /// The media path came back after an interruption
    MediaRestored,
    /// The local device was suspended
    DeviceSuspended,
}

impl NotificationId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationId::Reconnecting => "connection.reconnecting",
            NotificationId::MediaInterrupted => "connection.interrupted",
            NotificationId::MediaRestored => "connection.restored",
            NotificationId::DeviceSuspended => "connection.suspended",
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full-screen loaders the controller can show or hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderId {
    /// Shown while attempts are running
    AutoReconnect,
    /// Shown once attempts are exhausted and a reload is pending
    Reload,
}

impl LoaderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderId::AutoReconnect => "auto-reconnect",
            LoaderId::Reload => "reload",
        }
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a remote media track held by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef(pub String);

impl TrackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Commands the controller dispatches to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    ShowNotification(NotificationId),
    HideNotification(NotificationId),
    ShowLoader {
        id: LoaderId,
        message_key: &'static str,
    },
    HideLoader(LoaderId),
    /// Drop the stored auth token so the next connect fetches a fresh one
    ClearAuthToken,
    /// Discard a remote track from a connection that no longer exists
    RemoveRemoteTrack(TrackRef),
    /// Reload the whole client
    Reload,
}

/// The application the controller runs inside.
///
/// `dispatch` must not block; it is called from the controller loop and from
/// attempt tasks.
pub trait AppHost: Send + Sync {
    fn dispatch(&self, action: HostAction);

    /// Identifier of the current conference room, if any
    fn room_id(&self) -> Option<String>;

    /// Remote tracks belonging to the current session
    fn remote_tracks(&self) -> Vec<TrackRef>;
}
