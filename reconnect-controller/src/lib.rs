//! # reconnect-controller
//!
//! Bounded-retry recovery for a call's signaling connection.
//!
//! When signaling drops, the controller waits briefly to ride out network
//! blips, then runs a cleanup-then-reconnect sequence against a
//! [`SessionTransport`]. Failed attempts are retried after a shorter delay; once
//! the configured number of attempts is used up the host is told to reload.
//! A manual leave by the user cancels everything and suppresses recovery until
//! the connection is established again.
//!
//! ```text
//!            disconnect                 timer
//!   Idle ───────────────▶ WaitingToRetry ─────▶ Attempting ──▶ Idle (established)
//!    ▲                          ▲                   │
//!    │ manual leave             └──── failed ◀──────┤
//!    └── (from any phase)                           └── failed, max reached ──▶ Exhausted ──▶ reload
//! ```
//!
//! The controller runs as a single task fed through a [`ControllerHandle`]:
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use reconnect_controller::{AppHost, ManualLeaveFlag, ReconnectConfig, ReconnectController, SessionTransport};
//! # async fn example(transport: Arc<dyn SessionTransport>, host: Arc<dyn AppHost>) -> reconnect_controller::Result<()> {
//! let (controller, handle) = ReconnectController::new(
//!     ReconnectConfig::default(),
//!     transport,
//!     host,
//!     ManualLeaveFlag::new(),
//! )?;
//! tokio::spawn(controller.run());
//!
//! // Feed normalized events from the listener bridge
//! let dispatch = handle.dispatcher();
//! dispatch(conn_events::ConnectionEvent::SignalingDisconnected { message: None });
//!
//! assert!(!handle.status().is_manual_leave);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod flag;
pub mod guard;
pub mod host;
pub mod state;
pub mod task;
pub mod transport;

mod media;
mod recovery;

pub use config::{ReconnectConfig, RejoinStrategy};
pub use controller::{ControllerHandle, ReconnectController};
pub use error::{ControllerError, RecoveryError, Result, TransportError};
pub use flag::ManualLeaveFlag;
pub use guard::{AttemptGuard, AttemptPermit};
pub use host::{
    AppHost, HostAction, LoaderId, NotificationId, TrackRef, RECONNECTING_MESSAGE_KEY,
    RELOADING_MESSAGE_KEY,
};
pub use state::{RecoveryCause, RecoveryPhase, RecoverySnapshot};
pub use task::ScheduledTask;
pub use transport::SessionTransport;
