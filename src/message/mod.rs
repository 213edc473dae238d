//! # Message Catalog
//!
//! Static mapping from a [`MessageKey`] to the typed payload it carries.
//! The catalog is a fixed enumeration: every message the device can emit or
//! accept is a [`MessageId`] variant with an associated decoder, looked up
//! by `match`; there is no runtime handler registration to race against.
//!
//! Decoders verify payload length before reading any field, read multi-byte
//! integers little-endian, and apply no unit conversion; scaling raw values
//! (1e-7 degrees, millimeters, centi-deg/s) is a presentation concern.
//!
//! This catalog fixes the primary ID map of the device firmware; the
//! alternate map seen in some packages conflicts with it and is deliberately
//! not supported.

pub mod config;
pub mod status;
pub mod telemetry;

pub(crate) mod wire;

use crate::error::{Error, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use config::{GnssConfig, RecordingConfig};
use status::{Acknowledgement, DownloadStart, RecordingState, RecordingStatus};
use telemetry::TelemetryRecord;

/// Message class shared by every message in this catalog
pub const DEVICE_CLASS: u8 = 0xFF;

/// The `(class, id)` pair identifying a message's wire type and layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub class: u8,
    pub id: u8,
}

impl MessageKey {
    pub const fn new(class: u8, id: u8) -> Self {
        Self { class, id }
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}/{:02X}", self.class, self.id)
    }
}

/// Message IDs under [`DEVICE_CLASS`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum MessageId {
    /// Spontaneous live telemetry (80-byte record)
    LiveData = 0x01,
    /// Positive acknowledgment, payload echoes the acknowledged key
    Ack = 0x02,
    /// Negative acknowledgment, payload echoes the rejected key
    Nack = 0x03,
    /// Recorded telemetry streamed during a download (80-byte record)
    HistoryData = 0x21,
    /// Recording status read
    RecordingStatus = 0x22,
    /// Recording configuration, same key both directions
    RecordingConfig = 0x25,
    /// GNSS receiver configuration, same key both directions
    GnssConfig = 0x26,
    StartRecording = 0x28,
    StopRecording = 0x29,
    PauseRecording = 0x2A,
    UnlockMemory = 0x2B,
    EraseMemory = 0x2C,
    CancelErase = 0x2D,
    /// Download start; the reply on this key carries the stored record count
    StartDownload = 0x2E,
    CancelDownload = 0x2F,
    /// Spontaneous recording state-change notification
    StateChange = 0x30,
    /// Spontaneous erase progress notification (percent)
    EraseProgress = 0x31,
}

impl MessageId {
    /// The full message key for this ID
    pub const fn key(self) -> MessageKey {
        MessageKey::new(DEVICE_CLASS, self as u8)
    }
}

/// A decoded inbound payload, one variant per catalog entry the device emits.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    LiveData(TelemetryRecord),
    HistoryData(TelemetryRecord),
    RecordingStatus(RecordingStatus),
    RecordingConfig(RecordingConfig),
    GnssConfig(GnssConfig),
    StateChange(RecordingState),
    /// Erase progress in percent
    EraseProgress(u8),
    DownloadStart(DownloadStart),
    Ack(Acknowledgement),
    Nack(Acknowledgement),
}

/// Decode an inbound payload according to its message key.
///
/// Command IDs the device never sends (start/stop/pause, erase, unlock,
/// cancel) decode to a protocol error: a frame claiming one of those keys in
/// the inbound direction is device misbehavior, not a catalog gap.
pub fn decode_payload(key: MessageKey, payload: &[u8]) -> Result<InboundMessage> {
    if key.class != DEVICE_CLASS {
        return Err(Error::protocol(format!("unknown message class {:02X}", key.class)));
    }

    let id = MessageId::try_from(key.id)
        .map_err(|_| Error::protocol(format!("unknown message id {:02X}", key.id)))?;

    match id {
        MessageId::LiveData => Ok(InboundMessage::LiveData(TelemetryRecord::from_payload(payload)?)),
        MessageId::HistoryData => {
            Ok(InboundMessage::HistoryData(TelemetryRecord::from_payload(payload)?))
        }
        MessageId::RecordingStatus => {
            Ok(InboundMessage::RecordingStatus(RecordingStatus::from_payload(payload)?))
        }
        MessageId::RecordingConfig => {
            Ok(InboundMessage::RecordingConfig(RecordingConfig::from_payload(payload)?))
        }
        MessageId::GnssConfig => Ok(InboundMessage::GnssConfig(GnssConfig::from_payload(payload)?)),
        MessageId::StateChange => {
            Ok(InboundMessage::StateChange(RecordingState::from_payload(payload)?))
        }
        MessageId::EraseProgress => {
            wire::ensure_len("erase progress", 1, payload)?;
            Ok(InboundMessage::EraseProgress(payload[0]))
        }
        MessageId::StartDownload => {
            Ok(InboundMessage::DownloadStart(DownloadStart::from_payload(payload)?))
        }
        MessageId::Ack => Ok(InboundMessage::Ack(Acknowledgement::from_payload(payload))),
        MessageId::Nack => Ok(InboundMessage::Nack(Acknowledgement::from_payload(payload))),
        MessageId::StartRecording
        | MessageId::StopRecording
        | MessageId::PauseRecording
        | MessageId::UnlockMemory
        | MessageId::EraseMemory
        | MessageId::CancelErase
        | MessageId::CancelDownload => Err(Error::protocol(format!(
            "command id {:02X} is not valid inbound",
            key.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_round_trip_through_bytes() {
        for id in [
            MessageId::LiveData,
            MessageId::Ack,
            MessageId::Nack,
            MessageId::HistoryData,
            MessageId::RecordingStatus,
            MessageId::RecordingConfig,
            MessageId::GnssConfig,
            MessageId::StartDownload,
            MessageId::StateChange,
            MessageId::EraseProgress,
        ] {
            assert_eq!(MessageId::try_from(u8::from(id)).unwrap(), id);
            assert_eq!(id.key().class, DEVICE_CLASS);
        }
    }

    #[test]
    fn unknown_class_and_id_are_rejected() {
        assert!(decode_payload(MessageKey::new(0x06, 0x01), &[]).is_err());
        assert!(decode_payload(MessageKey::new(DEVICE_CLASS, 0x7F), &[]).is_err());
    }

    #[test]
    fn command_ids_are_invalid_inbound() {
        let err = decode_payload(MessageId::StartRecording.key(), &[]).unwrap_err();
        assert_eq!(err.category(), "protocol");
    }

    #[test]
    fn erase_progress_needs_one_byte() {
        assert!(decode_payload(MessageId::EraseProgress.key(), &[]).is_err());
        let msg = decode_payload(MessageId::EraseProgress.key(), &[42]).unwrap();
        assert_eq!(msg, InboundMessage::EraseProgress(42));
    }
}
