//! Transport port: the seam between this stack and the wireless link.
//!
//! The surrounding application owns connection establishment, pairing and
//! characteristic discovery; this crate only consumes the narrow contract
//! below. One call to [`Transport::subscribe`] hands over the inbound
//! notification stream; the [`crate::router::Router`] takes that
//! subscription exactly once for its whole lifetime.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Byte-oriented wireless transport to the device.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one encoded frame to the device. Failures surface as
    /// `Error::Connection`.
    async fn send(&self, frame: Bytes) -> Result<()>;

    /// Take the inbound notification stream. Each received `Bytes` is one
    /// complete frame as delivered by the link layer. Dropping the receiver
    /// cancels the subscription.
    fn subscribe(&self) -> mpsc::Receiver<Bytes>;
}
