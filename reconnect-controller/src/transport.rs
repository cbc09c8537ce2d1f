//! Reconnect operations of the media/signaling library.

use async_trait::async_trait;

use crate::error::TransportError;

/// Connection operations the recovery sequence calls.
///
/// Each call resolves when the library has accepted the request. Success of a
/// reconnect is confirmed separately by a signaling-established event.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Re-open the signaling connection
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Close the current connection
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Join `room_id` on the (re)opened connection
    async fn rejoin(&self, room_id: &str) -> Result<(), TransportError>;
}
