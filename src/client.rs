//! # Command use cases
//!
//! [`DeviceClient`] is the surface the surrounding application calls. Every
//! command is the same thin composition: validate inputs, encode the request
//! through the catalog, install the correlated waiter, transmit, await the
//! reply or deadline, translate to a typed result.
//!
//! Live data, history data, state changes, erase progress and ACK/NACK are
//! also exposed as persistent subscriptions; the device emits them
//! spontaneously, so they are never one-shot requests.

use crate::error::{Error, Result};
use crate::message::config::{GnssConfig, RecordingConfig};
use crate::message::status::{Acknowledgement, DownloadStart, RecordingState, RecordingStatus};
use crate::message::telemetry::TelemetryRecord;
use crate::message::{self, InboundMessage, MessageId, DEVICE_CLASS};
use crate::packet::{self, Packet};
use crate::router::{Router, SubscriptionHandle, DEFAULT_REQUEST_TIMEOUT};
use crate::transport::Transport;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Typed request/response client for one logger device.
pub struct DeviceClient {
    transport: Arc<dyn Transport>,
    router: Router,
    timeout: Duration,
}

impl DeviceClient {
    /// Build the client and its router over an established transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let router = Router::new(transport.as_ref());
        Self {
            transport,
            router,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request deadline (default 2000 ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying router, for raw subscriptions and stats.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Tear down the router; all in-flight requests fail with a disposed
    /// error.
    pub fn shutdown(&self) {
        self.router.shutdown();
    }

    // --- configuration -----------------------------------------------------

    /// Read the recording configuration from the device.
    pub async fn read_recording_config(&self) -> Result<RecordingConfig> {
        let reply = self
            .roundtrip(
                "read recording config",
                MessageId::RecordingConfig,
                &[],
                reply_on(MessageId::RecordingConfig),
            )
            .await?;
        match reply {
            InboundMessage::RecordingConfig(config) => Ok(config),
            other => Err(unexpected_reply("read recording config", &other)),
        }
    }

    /// Write a recording configuration; the device echoes the applied
    /// configuration on the same key.
    pub async fn set_recording_config(&self, config: &RecordingConfig) -> Result<RecordingConfig> {
        config.validate()?;
        let reply = self
            .roundtrip(
                "set recording config",
                MessageId::RecordingConfig,
                &config.to_payload(),
                reply_on(MessageId::RecordingConfig),
            )
            .await?;
        match reply {
            InboundMessage::RecordingConfig(applied) => Ok(applied),
            other => Err(unexpected_reply("set recording config", &other)),
        }
    }

    /// Read the GNSS receiver configuration.
    pub async fn read_gnss_config(&self) -> Result<GnssConfig> {
        let reply = self
            .roundtrip(
                "read gnss config",
                MessageId::GnssConfig,
                &[],
                reply_on(MessageId::GnssConfig),
            )
            .await?;
        match reply {
            InboundMessage::GnssConfig(config) => Ok(config),
            other => Err(unexpected_reply("read gnss config", &other)),
        }
    }

    /// Write the GNSS receiver configuration; echoed back on the same key.
    pub async fn set_gnss_config(&self, config: &GnssConfig) -> Result<GnssConfig> {
        config.validate()?;
        let reply = self
            .roundtrip(
                "set gnss config",
                MessageId::GnssConfig,
                &config.to_payload(),
                reply_on(MessageId::GnssConfig),
            )
            .await?;
        match reply {
            InboundMessage::GnssConfig(applied) => Ok(applied),
            other => Err(unexpected_reply("set gnss config", &other)),
        }
    }

    // --- recording control -------------------------------------------------

    /// Start standalone recording.
    pub async fn start_recording(&self) -> Result<()> {
        self.command("start recording", MessageId::StartRecording, &[])
            .await
    }

    /// Stop standalone recording.
    pub async fn stop_recording(&self) -> Result<()> {
        self.command("stop recording", MessageId::StopRecording, &[])
            .await
    }

    /// Pause standalone recording.
    ///
    /// The wire protocol defines no paused state distinct from disabled;
    /// observed firmware treats a paused logger as stopped and state-change
    /// notifications report [`RecordingState::Stopped`]. The dedicated pause
    /// command is still issued so firmware that does distinguish can honor
    /// it.
    pub async fn pause_recording(&self) -> Result<()> {
        self.command("pause recording", MessageId::PauseRecording, &[])
            .await
    }

    /// Read the recording status (memory level, stored record count).
    pub async fn read_recording_status(&self) -> Result<RecordingStatus> {
        let reply = self
            .roundtrip(
                "read recording status",
                MessageId::RecordingStatus,
                &[],
                reply_on(MessageId::RecordingStatus),
            )
            .await?;
        match reply {
            InboundMessage::RecordingStatus(status) => Ok(status),
            other => Err(unexpected_reply("read recording status", &other)),
        }
    }

    // --- memory ------------------------------------------------------------

    /// Unlock the history memory with the device security code.
    pub async fn unlock_memory(&self, code: u32) -> Result<()> {
        self.command("unlock memory", MessageId::UnlockMemory, &code.to_le_bytes())
            .await
    }

    /// Erase the history memory. Progress arrives via
    /// [`on_erase_progress`](Self::on_erase_progress).
    pub async fn erase_memory(&self) -> Result<()> {
        self.command("erase memory", MessageId::EraseMemory, &[]).await
    }

    /// Cancel an in-progress erase.
    pub async fn cancel_erase(&self) -> Result<()> {
        self.command("cancel erase", MessageId::CancelErase, &[]).await
    }

    // --- history download --------------------------------------------------

    /// Begin a history download. The reply carries the record count; the
    /// records themselves stream to
    /// [`on_history_data`](Self::on_history_data) subscribers.
    pub async fn start_download(&self) -> Result<DownloadStart> {
        let reply = self
            .roundtrip(
                "start download",
                MessageId::StartDownload,
                &[],
                reply_on(MessageId::StartDownload),
            )
            .await?;
        match reply {
            InboundMessage::DownloadStart(start) => Ok(start),
            other => Err(unexpected_reply("start download", &other)),
        }
    }

    /// Cancel an in-progress history download.
    pub async fn cancel_download(&self) -> Result<()> {
        self.command("cancel download", MessageId::CancelDownload, &[])
            .await
    }

    // --- subscriptions -----------------------------------------------------

    /// Subscribe to live telemetry. Undecodable payloads are skipped with a
    /// log line, never delivered partially populated.
    pub fn on_live_data(
        &self,
        callback: impl Fn(TelemetryRecord) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        decoded_subscription(&self.router, MessageId::LiveData, callback, |payload| {
            TelemetryRecord::from_payload(payload)
        })
    }

    /// Subscribe to history records streamed during a download.
    pub fn on_history_data(
        &self,
        callback: impl Fn(TelemetryRecord) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        decoded_subscription(&self.router, MessageId::HistoryData, callback, |payload| {
            TelemetryRecord::from_payload(payload)
        })
    }

    /// Subscribe to recording state-change notifications.
    pub fn on_state_change(
        &self,
        callback: impl Fn(RecordingState) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        decoded_subscription(&self.router, MessageId::StateChange, callback, |payload| {
            RecordingState::from_payload(payload)
        })
    }

    /// Subscribe to erase progress notifications (percent).
    pub fn on_erase_progress(
        &self,
        callback: impl Fn(u8) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        decoded_subscription(&self.router, MessageId::EraseProgress, callback, |payload| {
            message::wire::ensure_len("erase progress", 1, payload)?;
            Ok(payload[0])
        })
    }

    /// Subscribe to spontaneous positive acknowledgments.
    pub fn on_ack(
        &self,
        callback: impl Fn(Acknowledgement) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.router.subscribe(MessageId::Ack.key(), move |payload| {
            callback(Acknowledgement::from_payload(payload));
        })
    }

    /// Subscribe to spontaneous negative acknowledgments.
    pub fn on_nack(
        &self,
        callback: impl Fn(Acknowledgement) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.router.subscribe(MessageId::Nack.key(), move |payload| {
            callback(Acknowledgement::from_payload(payload));
        })
    }

    // --- plumbing ----------------------------------------------------------

    /// Encode, install the waiter, transmit, await. The waiter is installed
    /// before the frame reaches the transport so a reply arriving in the
    /// same scheduler tick still correlates.
    async fn roundtrip(
        &self,
        operation: &'static str,
        request: MessageId,
        payload: &[u8],
        predicate: impl Fn(&Packet) -> Option<InboundMessage> + Send + 'static,
    ) -> Result<InboundMessage> {
        let frame = packet::encode(DEVICE_CLASS, request as u8, payload)?;
        let reply = self.router.register(operation, predicate, self.timeout);
        debug!(operation, id = ?request, len = frame.len(), "sending request");
        self.transport.send(Bytes::from(frame)).await?;
        reply.wait().await
    }

    /// Fire a command whose only reply is ACK or NACK.
    async fn command(
        &self,
        operation: &'static str,
        request: MessageId,
        payload: &[u8],
    ) -> Result<()> {
        let reply = self
            .roundtrip(operation, request, payload, ack_or_nack(request))
            .await?;
        match reply {
            InboundMessage::Ack(_) => Ok(()),
            InboundMessage::Nack(_) => Err(Error::device(
                format!("device rejected {operation}"),
                Some(request as u8),
            )),
            other => Err(unexpected_reply(operation, &other)),
        }
    }
}

/// Predicate matching a reply on a single key, decoded through the catalog.
/// A packet on the right key with an undecodable payload does not resolve
/// the waiter; it stays pending until the deadline.
fn reply_on(reply_id: MessageId) -> impl Fn(&Packet) -> Option<InboundMessage> + Send + 'static {
    move |packet| {
        if packet.key() != reply_id.key() {
            return None;
        }
        message::decode_payload(packet.key(), &packet.payload).ok()
    }
}

/// Predicate matching ACK or NACK for a specific command, whichever arrives
/// first. When the acknowledgment echoes a key it must be the command's;
/// empty acknowledgments match by key alone.
fn ack_or_nack(command: MessageId) -> impl Fn(&Packet) -> Option<InboundMessage> + Send + 'static {
    move |packet| {
        let key = packet.key();
        if key != MessageId::Ack.key() && key != MessageId::Nack.key() {
            return None;
        }
        let ack = Acknowledgement::from_payload(&packet.payload);
        if !ack.refers_to(command.key()) {
            return None;
        }
        Some(if key == MessageId::Ack.key() {
            InboundMessage::Ack(ack)
        } else {
            InboundMessage::Nack(ack)
        })
    }
}

fn unexpected_reply(operation: &str, reply: &InboundMessage) -> Error {
    Error::device(
        format!("unexpected reply to {operation}: {reply:?}"),
        None,
    )
}

fn decoded_subscription<T, D>(
    router: &Router,
    id: MessageId,
    callback: impl Fn(T) + Send + Sync + 'static,
    decode: D,
) -> SubscriptionHandle
where
    D: Fn(&[u8]) -> Result<T> + Send + Sync + 'static,
{
    router.subscribe(id.key(), move |payload| match decode(payload) {
        Ok(value) => callback(value),
        Err(err) => warn!(id = ?id, error = %err, "skipping undecodable notification payload"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::status::RECORDING_STATUS_LEN;

    fn packet(id: MessageId, payload: &[u8]) -> Packet {
        Packet {
            class: DEVICE_CLASS,
            id: id as u8,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn reply_predicate_matches_key_and_layout() {
        let predicate = reply_on(MessageId::RecordingStatus);

        // Wrong key never matches.
        assert!(predicate(&packet(MessageId::LiveData, &[0; 80])).is_none());

        // Right key with an undecodable payload stays pending.
        assert!(predicate(&packet(MessageId::RecordingStatus, &[1, 2])).is_none());

        let reply = predicate(&packet(
            MessageId::RecordingStatus,
            &[0; RECORDING_STATUS_LEN],
        ));
        assert!(matches!(reply, Some(InboundMessage::RecordingStatus(_))));
    }

    #[test]
    fn ack_predicate_honors_the_echoed_key() {
        let predicate = ack_or_nack(MessageId::StartRecording);

        let echo = [DEVICE_CLASS, MessageId::StartRecording as u8];
        assert!(matches!(
            predicate(&packet(MessageId::Ack, &echo)),
            Some(InboundMessage::Ack(_))
        ));
        assert!(matches!(
            predicate(&packet(MessageId::Nack, &echo)),
            Some(InboundMessage::Nack(_))
        ));

        // An acknowledgment for a different command is not ours.
        let other = [DEVICE_CLASS, MessageId::EraseMemory as u8];
        assert!(predicate(&packet(MessageId::Ack, &other)).is_none());

        // Empty echo matches by key alone.
        assert!(predicate(&packet(MessageId::Ack, &[])).is_some());

        // Unrelated packets never match.
        assert!(predicate(&packet(MessageId::LiveData, &[0; 80])).is_none());
    }
}
