//! Status, acknowledgment and notification payloads.

use super::{wire, MessageKey};
use crate::error::{Error, Result};
use num_enum::TryFromPrimitive;

/// Wire size of a recording status reply
pub const RECORDING_STATUS_LEN: usize = 10;

/// Reply to a recording status read.
///
/// Layout (little-endian): `[recording u8][memory level % u8]
/// [stored records u32][total capacity u32]`. Decoded with a minimum-length
/// check so longer replies from newer firmware still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordingStatus {
    pub recording: bool,
    /// Fill level of the history memory, percent
    pub memory_level_percent: u8,
    /// Telemetry records currently stored
    pub stored_records: u32,
    /// Total record capacity of the memory
    pub total_capacity: u32,
}

impl RecordingStatus {
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_len("recording status", RECORDING_STATUS_LEN, payload)?;
        Ok(Self {
            recording: payload[0] != 0,
            memory_level_percent: payload[1],
            stored_records: wire::u32_at(payload, 2),
            total_capacity: wire::u32_at(payload, 6),
        })
    }

    pub fn to_payload(&self) -> [u8; RECORDING_STATUS_LEN] {
        let mut p = [0u8; RECORDING_STATUS_LEN];
        p[0] = u8::from(self.recording);
        p[1] = self.memory_level_percent;
        p[2..6].copy_from_slice(&self.stored_records.to_le_bytes());
        p[6..10].copy_from_slice(&self.total_capacity.to_le_bytes());
        p
    }
}

/// Recording state carried by a state-change notification.
///
/// The wire defines no paused value distinct from stopped; pause shows up
/// as `Stopped` in notifications.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum RecordingState {
    Stopped = 0,
    Recording = 1,
}

impl RecordingState {
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_len("state change", 1, payload)?;
        RecordingState::try_from(payload[0])
            .map_err(|_| Error::protocol(format!("unknown recording state {:02X}", payload[0])))
    }
}

/// Payload of an ACK or NACK: a two-byte echo of the acknowledged key.
/// Some firmware revisions send empty acknowledgments; those carry no echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    pub acknowledged: Option<MessageKey>,
}

impl Acknowledgement {
    pub fn from_payload(payload: &[u8]) -> Self {
        if payload.len() >= 2 {
            Self {
                acknowledged: Some(MessageKey::new(payload[0], payload[1])),
            }
        } else {
            Self { acknowledged: None }
        }
    }

    /// Whether this acknowledgment refers to `key` (an empty echo matches
    /// nothing in particular and is treated as referring to any command).
    pub fn refers_to(&self, key: MessageKey) -> bool {
        match self.acknowledged {
            Some(echoed) => echoed == key,
            None => true,
        }
    }
}

/// Reply to a start-download request: how many history records will follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadStart {
    pub record_count: u32,
}

impl DownloadStart {
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        wire::ensure_len("download start", 4, payload)?;
        Ok(Self {
            record_count: wire::u32_at(payload, 0),
        })
    }

    pub fn to_payload(&self) -> [u8; 4] {
        self.record_count.to_le_bytes()
    }
}
