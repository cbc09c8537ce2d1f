//! # conn-events
//!
//! Subscription plumbing between a real-time media/signaling library and the
//! reconnect controller.
//!
//! The library is treated as a black box exposing named signals through
//! [`EventTarget`]. The bridge functions attach one listener per signal,
//! keep the handles needed to remove them again, and translate raw signals
//! into the small [`ConnectionEvent`] set:
//!
//! ```text
//! signaling connection ──┐
//!                        ├─ bridge ─ ConnectionEvent ─▶ Dispatch
//! conference media ──────┘
//! ```
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use conn_events::{
//!     attach_signaling_listeners, detach_signaling_listeners, ConnectionEvent, ConnectionState,
//!     Dispatch, Emitter, EventTarget, SignalPayload, SignalingSignal,
//! };
//!
//! let connection: Arc<Emitter<SignalingSignal>> = Arc::new(Emitter::new());
//! let target: Arc<dyn EventTarget<SignalingSignal>> = connection.clone();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let dispatch: Dispatch = Arc::new(move |event| sink.lock().unwrap().push(event));
//!
//! let mut state = ConnectionState::new();
//! attach_signaling_listeners(Some(&target), &dispatch, &mut state);
//!
//! connection.emit(SignalingSignal::Established, SignalPayload::Empty);
//! assert_eq!(seen.lock().unwrap()[0], ConnectionEvent::SignalingEstablished);
//!
//! detach_signaling_listeners(&mut state);
//! assert_eq!(connection.total_listeners(), 0);
//! ```

pub mod bridge;
pub mod emitter;
pub mod event;
pub mod signal;
pub mod state;

pub use bridge::{
    attach_media_listeners, attach_signaling_listeners, detach_media_listeners,
    detach_signaling_listeners, AttachOutcome, DetachOutcome,
};
pub use emitter::Emitter;
pub use event::{
    ConnectionEvent, ConnectionFailure, Dispatch, FailureKind, CREDENTIAL_EXPIRED_REASON,
};
pub use signal::{
    EventTarget, ListenerHandle, MediaSignal, SignalHandler, SignalPayload, SignalingSignal,
};
pub use state::{ConnectionState, ListenerGroup};
