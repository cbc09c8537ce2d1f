//! Media path status notices.
//!
//! Media interruptions do not trigger recovery (signaling may still be up);
//! they only drive user-facing notices.

use conn_events::ConnectionEvent;

use crate::host::{AppHost, HostAction, NotificationId};

/// Tracks which media notices are currently shown.
#[derive(Debug, Default)]
pub(crate) struct MediaNotices {
    interrupted: bool,
    restored: bool,
    suspended: bool,
}

impl MediaNotices {
    pub(crate) fn apply(&mut self, event: &ConnectionEvent, host: &dyn AppHost) {
        match event {
            ConnectionEvent::MediaInterrupted => {
                tracing::info!("media connection interrupted");
                if std::mem::take(&mut self.restored) {
                    host.dispatch(HostAction::HideNotification(NotificationId::MediaRestored));
                }
                if !self.interrupted {
                    host.dispatch(HostAction::ShowNotification(NotificationId::MediaInterrupted));
                    self.interrupted = true;
                }
            }
            ConnectionEvent::MediaRestored { after_interruption } => {
                if self.interrupted {
                    host.dispatch(HostAction::HideNotification(NotificationId::MediaInterrupted));
                    self.interrupted = false;
                }
                if *after_interruption {
                    tracing::info!("media connection restored");
                    host.dispatch(HostAction::ShowNotification(NotificationId::MediaRestored));
                    self.restored = true;
                } else {
                    tracing::debug!("media restored without prior interruption, no notice");
                }
            }
            ConnectionEvent::DeviceSuspended => {
                tracing::info!("device suspension detected");
                if !self.suspended {
                    host.dispatch(HostAction::ShowNotification(NotificationId::DeviceSuspended));
                    self.suspended = true;
                }
            }
            _ => {}
        }
    }

    /// Hide every media notice that is showing
    pub(crate) fn hide_all(&mut self, host: &dyn AppHost) {
        if std::mem::take(&mut self.interrupted) {
            host.dispatch(HostAction::HideNotification(NotificationId::MediaInterrupted));
        }
        if std::mem::take(&mut self.restored) {
            host.dispatch(HostAction::HideNotification(NotificationId::MediaRestored));
        }
        if std::mem::take(&mut self.suspended) {
            host.dispatch(HostAction::HideNotification(NotificationId::DeviceSuspended));
        }
    }
}
