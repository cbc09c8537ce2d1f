//! Per-session listener bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::signal::{EventTarget, ListenerHandle, MediaSignal, SignalingSignal};

/// Registration state of one group of listeners on one transport object.
///
/// `attach` and `detach` in [`crate::bridge`] are the only transitions.
pub enum ListenerGroup<S: 'static> {
    /// Nothing registered
    Detached,
    /// Listeners registered on `target`
    Attached {
        /// Back-reference used only to remove the listeners again
        target: Weak<dyn EventTarget<S>>,
        /// Handles returned by the target, one per subscribed signal
        handles: Vec<(S, ListenerHandle)>,
    },
}

impl<S: 'static> ListenerGroup<S> {
    pub fn is_attached(&self) -> bool {
        matches!(self, ListenerGroup::Attached { .. })
    }

    /// Number of registered handles (0 when detached)
    pub fn handle_count(&self) -> usize {
        match self {
            ListenerGroup::Detached => 0,
            ListenerGroup::Attached { handles, .. } => handles.len(),
        }
    }

    /// Move out the attached registration, leaving the group detached
    pub(crate) fn take(&mut self) -> ListenerGroup<S> {
        std::mem::replace(self, ListenerGroup::Detached)
    }
}

impl<S: 'static> Default for ListenerGroup<S> {
    fn default() -> Self {
        ListenerGroup::Detached
    }
}

impl<S: std::fmt::Debug + 'static> std::fmt::Debug for ListenerGroup<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerGroup::Detached => f.write_str("Detached"),
            ListenerGroup::Attached { target, handles } => f
                .debug_struct("Attached")
                .field("target_alive", &(target.strong_count() > 0))
                .field("handles", handles)
                .finish(),
        }
    }
}

/// Listener state for one active call session.
///
/// Created when the session starts. Dropping it detaches whatever is still
/// attached so no subscription outlives the session.
#[derive(Debug, Default)]
pub struct ConnectionState {
    pub(crate) media: ListenerGroup<MediaSignal>,
    pub(crate) signaling: ListenerGroup<SignalingSignal>,
    /// Shared with the media listeners, which run outside `&mut self`
    pub(crate) media_was_interrupted: Arc<AtomicBool>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_media_listeners(&self) -> bool {
        self.media.is_attached()
    }

    pub fn has_signaling_listeners(&self) -> bool {
        self.signaling.is_attached()
    }

    /// True once a media interruption has been seen and not yet restored
    pub fn media_was_interrupted(&self) -> bool {
        self.media_was_interrupted.load(Ordering::SeqCst)
    }

    pub fn media_listeners(&self) -> &ListenerGroup<MediaSignal> {
        &self.media
    }

    pub fn signaling_listeners(&self) -> &ListenerGroup<SignalingSignal> {
        &self.signaling
    }
}

impl Drop for ConnectionState {
    fn drop(&mut self) {
        if self.media.is_attached() || self.signaling.is_attached() {
            tracing::debug!(
                media = self.media.is_attached(),
                signaling = self.signaling.is_attached(),
                "ConnectionState dropped with listeners attached, detaching"
            );
            crate::bridge::detach_media_listeners(self);
            crate::bridge::detach_signaling_listeners(self);
        }
    }
}
