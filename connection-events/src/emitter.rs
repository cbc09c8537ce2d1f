//! In-process signal emitter.
//!
//! `Emitter` keeps a table of registered listeners and fans emitted signals
//! out to every listener registered for that signal. Hosts that drive the
//! controller from their own event source can use it directly; the test
//! suites use it to stand in for the media library.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::signal::{EventTarget, ListenerHandle, SignalHandler, SignalPayload};

/// Routes emitted signals to registered listeners.
pub struct Emitter<S> {
    /// Registered listeners keyed by handle
    listeners: DashMap<ListenerHandle, (S, SignalHandler)>,
    /// Source of fresh handle ids
    next_id: AtomicU64,
}

impl<S> Emitter<S>
where
    S: Copy + Eq + Hash + Send + Sync + std::fmt::Debug,
{
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver `payload` to every listener registered for `signal`.
    ///
    /// Returns the number of listeners invoked. Handlers are collected before
    /// being called so a handler may add or remove listeners re-entrantly.
    pub fn emit(&self, signal: S, payload: SignalPayload) -> usize {
        let handlers: Vec<SignalHandler> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().0 == signal)
            .map(|entry| entry.value().1.clone())
            .collect();

        tracing::trace!(?signal, listeners = handlers.len(), "emitting signal");

        for handler in &handlers {
            handler(payload.clone());
        }

        handlers.len()
    }

    /// Number of listeners currently registered for `signal`
    pub fn listener_count(&self, signal: S) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.value().0 == signal)
            .count()
    }

    /// Total number of registered listeners
    pub fn total_listeners(&self) -> usize {
        self.listeners.len()
    }
}

impl<S> Default for Emitter<S>
where
    S: Copy + Eq + Hash + Send + Sync + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> EventTarget<S> for Emitter<S>
where
    S: Copy + Eq + Hash + Send + Sync + std::fmt::Debug,
{
    fn add_listener(&self, signal: S, handler: SignalHandler) -> ListenerHandle {
        let handle = ListenerHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(handle, (signal, handler));
        handle
    }

    fn remove_listener(&self, signal: S, handle: ListenerHandle) -> bool {
        self.listeners
            .remove_if(&handle, |_, (registered, _)| *registered == signal)
            .is_some()
    }
}

impl<S> std::fmt::Debug for Emitter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalingSignal;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> SignalHandler {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_matching_listeners() {
        let emitter = Emitter::new();
        let established = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(SignalingSignal::Established, counting_handler(&established));
        emitter.add_listener(SignalingSignal::Failed, counting_handler(&failed));

        assert_eq!(emitter.emit(SignalingSignal::Established, SignalPayload::Empty), 1);
        assert_eq!(established.load(Ordering::SeqCst), 1);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_requires_matching_signal_and_handle() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = emitter.add_listener(SignalingSignal::Disconnected, counting_handler(&counter));

        // Wrong signal leaves the listener in place
        assert!(!emitter.remove_listener(SignalingSignal::Failed, handle));
        assert_eq!(emitter.listener_count(SignalingSignal::Disconnected), 1);

        assert!(emitter.remove_listener(SignalingSignal::Disconnected, handle));
        assert!(!emitter.remove_listener(SignalingSignal::Disconnected, handle));
        assert_eq!(emitter.total_listeners(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = emitter.add_listener(SignalingSignal::Established, counting_handler(&counter));
        let b = emitter.add_listener(SignalingSignal::Established, counting_handler(&counter));
        assert_ne!(a, b);
        assert_eq!(emitter.emit(SignalingSignal::Established, SignalPayload::Empty), 2);
    }
}
