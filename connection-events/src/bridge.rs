//! Event listener bridge.
//!
//! Attaches listeners to the signaling connection and the conference media
//! path, normalizes their signals into [`ConnectionEvent`]s, and forwards them
//! to a [`Dispatch`]. Attach and detach are idempotent: attaching twice keeps
//! a single set of subscriptions and detaching with nothing attached is a
//! logged no-op.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::event::{ConnectionEvent, ConnectionFailure, Dispatch};
use crate::signal::{EventTarget, MediaSignal, SignalHandler, SignalPayload, SignalingSignal};
use crate::state::{ConnectionState, ListenerGroup};

/// Reason used when the library reports a failure without one
const UNKNOWN_FAILURE_REASON: &str = "connection.unknownError";

/// Result of an attach call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Listeners were registered
    Attached,
    /// Listeners were already registered; nothing changed
    AlreadyAttached,
    /// No transport object was supplied; nothing changed
    NoTarget,
}

/// Result of a detach call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// Listeners were removed from the transport object
    Detached,
    /// Nothing was attached
    NothingAttached,
    /// The transport object was already gone; references were cleared
    TargetGone,
}

/// Attach media-path listeners (interrupted, restored, device suspended).
pub fn attach_media_listeners(
    target: Option<&Arc<dyn EventTarget<MediaSignal>>>,
    dispatch: &Dispatch,
    state: &mut ConnectionState,
) -> AttachOutcome {
    let interrupted = Arc::clone(&state.media_was_interrupted);
    let outcome = attach_group(&mut state.media, target, "media", |signal| {
        media_handler(signal, Arc::clone(dispatch), Arc::clone(&interrupted))
    });

    if outcome == AttachOutcome::Attached {
        // A fresh media path starts without a pending interruption
        state.media_was_interrupted.store(false, Ordering::SeqCst);
    }
    outcome
}

/// Remove media-path listeners using the handles captured at attach time.
pub fn detach_media_listeners(state: &mut ConnectionState) -> DetachOutcome {
    detach_group(&mut state.media, "media")
}

/// Attach signaling listeners (established, disconnected, failed).
pub fn attach_signaling_listeners(
    target: Option<&Arc<dyn EventTarget<SignalingSignal>>>,
    dispatch: &Dispatch,
    state: &mut ConnectionState,
) -> AttachOutcome {
    attach_group(&mut state.signaling, target, "signaling", |signal| {
        signaling_handler(signal, Arc::clone(dispatch))
    })
}

/// Remove signaling listeners using the handles captured at attach time.
pub fn detach_signaling_listeners(state: &mut ConnectionState) -> DetachOutcome {
    detach_group(&mut state.signaling, "signaling")
}

fn attach_group<S, F>(
    group: &mut ListenerGroup<S>,
    target: Option<&Arc<dyn EventTarget<S>>>,
    label: &'static str,
    make_handler: F,
) -> AttachOutcome
where
    S: Copy + Debug + SignalSet + 'static,
    F: Fn(S) -> SignalHandler,
{
    if group.is_attached() {
        tracing::debug!(group = label, "listeners already attached, skipping");
        return AttachOutcome::AlreadyAttached;
    }

    let Some(target) = target else {
        tracing::debug!(group = label, "no transport object, skipping listener setup");
        return AttachOutcome::NoTarget;
    };

    let handles = S::signals()
        .iter()
        .map(|&signal| (signal, target.add_listener(signal, make_handler(signal))))
        .collect::<Vec<_>>();

    tracing::debug!(group = label, count = handles.len(), "listeners attached");

    *group = ListenerGroup::Attached {
        target: Arc::downgrade(target),
        handles,
    };
    AttachOutcome::Attached
}

fn detach_group<S>(group: &mut ListenerGroup<S>, label: &'static str) -> DetachOutcome
where
    S: Copy + Debug + 'static,
{
    match group.take() {
        ListenerGroup::Detached => {
            tracing::debug!(group = label, "no listeners to remove");
            DetachOutcome::NothingAttached
        }
        ListenerGroup::Attached { target, handles } => match target.upgrade() {
            Some(target) => {
                for (signal, handle) in handles {
                    if !target.remove_listener(signal, handle) {
                        tracing::debug!(
                            group = label,
                            ?signal,
                            %handle,
                            "transport did not know listener"
                        );
                    }
                }
                tracing::debug!(group = label, "listeners removed");
                DetachOutcome::Detached
            }
            None => {
                tracing::debug!(group = label, "transport already dropped, clearing references");
                DetachOutcome::TargetGone
            }
        },
    }
}

/// Signal groups the bridge knows how to subscribe to.
trait SignalSet: Sized + 'static {
    fn signals() -> &'static [Self];
}

impl SignalSet for MediaSignal {
    fn signals() -> &'static [Self] {
        &MediaSignal::ALL
    }
}

impl SignalSet for SignalingSignal {
    fn signals() -> &'static [Self] {
        &SignalingSignal::ALL
    }
}

fn media_handler(
    signal: MediaSignal,
    dispatch: Dispatch,
    interrupted: Arc<AtomicBool>,
) -> SignalHandler {
    Arc::new(move |_payload| {
        let event = match signal {
            MediaSignal::Interrupted => {
                interrupted.store(true, Ordering::SeqCst);
                ConnectionEvent::MediaInterrupted
            }
            MediaSignal::Restored => ConnectionEvent::MediaRestored {
                after_interruption: interrupted.swap(false, Ordering::SeqCst),
            },
            MediaSignal::DeviceSuspended => ConnectionEvent::DeviceSuspended,
        };
        dispatch(event);
    })
}

fn signaling_handler(signal: SignalingSignal, dispatch: Dispatch) -> SignalHandler {
    Arc::new(move |payload| {
        let event = match signal {
            SignalingSignal::Established => ConnectionEvent::SignalingEstablished,
            SignalingSignal::Disconnected => ConnectionEvent::SignalingDisconnected {
                message: match payload {
                    SignalPayload::Message(message) => Some(message),
                    SignalPayload::Failure { message, .. } => message,
                    SignalPayload::Empty => None,
                },
            },
            SignalingSignal::Failed => ConnectionEvent::SignalingFailed(normalize_failure(payload)),
        };
        dispatch(event);
    })
}

fn normalize_failure(payload: SignalPayload) -> ConnectionFailure {
    match payload {
        SignalPayload::Failure { reason, message } => ConnectionFailure { reason, message },
        SignalPayload::Message(message) => {
            ConnectionFailure::new(UNKNOWN_FAILURE_REASON).with_message(message)
        }
        SignalPayload::Empty => ConnectionFailure::new(UNKNOWN_FAILURE_REASON),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FailureKind;

    #[test]
    fn test_normalize_failure_keeps_reason() {
        let failure = normalize_failure(SignalPayload::Failure {
            reason: "connection.passwordRequired".to_string(),
            message: None,
        });
        assert_eq!(failure.kind(), FailureKind::CredentialExpired);
    }

    #[test]
    fn test_normalize_failure_without_reason() {
        let failure = normalize_failure(SignalPayload::Message("boom".to_string()));
        assert_eq!(failure.reason, UNKNOWN_FAILURE_REASON);
        assert_eq!(failure.message.as_deref(), Some("boom"));
        assert_eq!(failure.kind(), FailureKind::Other);
    }
}
