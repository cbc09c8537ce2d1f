//! # meet-resilience
//!
//! Keeps a conference call alive across network trouble.
//!
//! A [`CallSession`] listens to the call's signaling connection and media
//! path. When signaling drops it waits out short blips, then runs bounded
//! reconnect attempts, showing a "reconnecting" indicator through the host.
//! If every attempt fails the host is asked to reload the client. Hanging up
//! cancels all of it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meet_resilience::prelude::*;
//!
//! # async fn example(
//! #     transport: Arc<dyn SessionTransport>,
//! #     host: Arc<dyn AppHost>,
//! #     signaling: Arc<dyn EventTarget<SignalingSignal>>,
//! #     media: Arc<dyn EventTarget<MediaSignal>>,
//! # ) -> Result<(), SessionError> {
//! meet_resilience::logging::init_logging_from_env().ok();
//!
//! let session = CallSession::builder()
//!     .with_config(ReconnectConfig::default())
//!     .with_transport(transport)
//!     .with_host(host)
//!     .with_signaling_source(signaling)
//!     .with_media_source(media)
//!     .start()?;
//!
//! // ... later, when the user hangs up
//! session.leave()?;
//! session.end().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! ```text
//! meet-resilience (session facade, logging)
//!     ├── reconnect-controller (state machine, recovery sequence)
//!     └── conn-events (signals, listener bridge)
//! ```

pub mod logging;

mod error;
mod session;

pub use error::{Result, SessionError};
pub use session::{CallSession, CallSessionBuilder};

pub use conn_events;
pub use reconnect_controller;

/// Types needed to embed a call session
pub mod prelude {
    pub use crate::{CallSession, CallSessionBuilder, SessionError};
    pub use conn_events::{
        ConnectionEvent, ConnectionFailure, Emitter, EventTarget, MediaSignal, SignalPayload,
        SignalingSignal,
    };
    pub use reconnect_controller::{
        AppHost, HostAction, LoaderId, ManualLeaveFlag, NotificationId, ReconnectConfig,
        RecoveryPhase, RecoverySnapshot, RejoinStrategy, SessionTransport, TrackRef,
        TransportError,
    };
}
