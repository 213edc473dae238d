//! # Packet Codec: UBX-style frame encoding and decoding
//!
//! ## Purpose
//!
//! Pure, stateless conversion between a structured `class`/`id`/payload
//! triple and the flat byte sequence the device speaks: two sync bytes, a
//! four-byte header, the payload, and a two-accumulator rolling-sum checksum.
//!
//! ## Wire layout
//!
//! ```text
//! [0xB5][0x62][class][id][len lo][len hi][payload ...][ckA][ckB]
//! ```
//!
//! The checksum covers every byte from `class` through the last payload byte:
//! `ckA = (ckA + byte) mod 256`, `ckB = (ckB + ckA) mod 256`.
//!
//! Decoding never partially mutates caller state; a frame either yields a
//! complete [`Packet`] or a protocol error.

use crate::error::{Error, Result};
use crate::message::MessageKey;

/// First sync byte of every frame
pub const SYNC1: u8 = 0xB5;
/// Second sync byte of every frame
pub const SYNC2: u8 = 0x62;
/// Sync bytes plus class, id and the 16-bit length field
pub const HEADER_LEN: usize = 6;
/// Header plus the trailing two checksum bytes
pub const FRAME_OVERHEAD: usize = 8;
/// The length field is 16 bits, so payloads cap at 65535 bytes
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// A decoded frame: message key plus owned payload bytes.
///
/// Packets are immutable once decoded and produced fresh for every send;
/// nothing in the stack mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub class: u8,
    pub id: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// The `(class, id)` pair that identifies this packet's semantic type
    pub fn key(&self) -> MessageKey {
        MessageKey::new(self.class, self.id)
    }
}

/// Rolling-sum checksum over `class ‖ id ‖ length ‖ payload`.
pub fn checksum(data: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;
    for &byte in data {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    (ck_a, ck_b)
}

/// Encode a frame ready for the transport.
///
/// A zero-length payload is valid. Payloads beyond the 16-bit length field
/// are rejected; fragmentation is the caller's problem, not the codec's.
pub fn encode(class: u8, id: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::protocol(format!(
            "payload of {} bytes exceeds the 16-bit length field",
            payload.len()
        )));
    }

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.push(SYNC1);
    frame.push(SYNC2);
    frame.push(class);
    frame.push(id);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);

    let (ck_a, ck_b) = checksum(&frame[2..]);
    frame.push(ck_a);
    frame.push(ck_b);
    Ok(frame)
}

/// Decode one frame, validating sync bytes, declared length and checksum.
pub fn decode(frame: &[u8]) -> Result<Packet> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(Error::protocol(format!(
            "frame of {} bytes is shorter than the {FRAME_OVERHEAD}-byte minimum",
            frame.len()
        )));
    }

    if frame[0] != SYNC1 || frame[1] != SYNC2 {
        return Err(Error::protocol(format!(
            "bad sync bytes {:02X} {:02X}",
            frame[0], frame[1]
        )));
    }

    let declared = u16::from_le_bytes([frame[4], frame[5]]) as usize;
    let total = FRAME_OVERHEAD + declared;
    if frame.len() < total {
        return Err(Error::protocol(format!(
            "declared payload of {declared} bytes overruns the {}-byte frame",
            frame.len()
        )));
    }
    if frame.len() > total {
        return Err(Error::protocol(format!(
            "{} trailing bytes after a {total}-byte frame",
            frame.len() - total
        )));
    }

    let body = &frame[2..HEADER_LEN + declared];
    let expected = checksum(body);
    let actual = (frame[total - 2], frame[total - 1]);
    if expected != actual {
        return Err(Error::checksum_mismatch(expected, actual));
    }

    Ok(Packet {
        class: frame[2],
        id: frame[3],
        payload: frame[HEADER_LEN..HEADER_LEN + declared].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_frame() {
        // UBX reference vector: class 0x06, id 0x01, payload [0xF0, 0x05, 0x01]
        let frame = encode(0x06, 0x01, &[0xF0, 0x05, 0x01]).unwrap();
        assert_eq!(frame[..2], [SYNC1, SYNC2]);
        assert_eq!(frame[2..6], [0x06, 0x01, 0x03, 0x00]);
        let (ck_a, ck_b) = checksum(&frame[2..frame.len() - 2]);
        assert_eq!(frame[frame.len() - 2..], [ck_a, ck_b]);
    }

    #[test]
    fn round_trip() {
        let payload: Vec<u8> = (0..80).collect();
        let frame = encode(0xFF, 0x01, &payload).unwrap();
        let packet = decode(&frame).unwrap();
        assert_eq!(packet.class, 0xFF);
        assert_eq!(packet.id, 0x01);
        assert_eq!(packet.payload, payload);
    }

    #[test]
    fn zero_length_payload_is_valid() {
        let frame = encode(0xFF, 0x25, &[]).unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD);
        let packet = decode(&frame).unwrap();
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn rejects_short_and_bad_sync() {
        assert!(decode(&[SYNC1, SYNC2, 0xFF]).is_err());
        let mut frame = encode(0xFF, 0x22, &[1, 2]).unwrap();
        frame[0] = 0xAA;
        assert!(decode(&frame).is_err());
    }

    #[test]
    fn rejects_overrunning_length() {
        let mut frame = encode(0xFF, 0x22, &[1, 2, 3]).unwrap();
        frame[4] = 200; // declared length far beyond the buffer
        assert!(decode(&frame).is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        let mut frame = encode(0xFF, 0x22, &[1, 2, 3]).unwrap();
        frame.push(0x00);
        assert!(decode(&frame).is_err());
    }

    #[test]
    fn flipping_any_covered_byte_fails_the_checksum() {
        let frame = encode(0xFF, 0x01, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        // Header and payload bytes: a single-bit flip must be caught.
        for idx in 2..frame.len() - 2 {
            let mut corrupted = frame.clone();
            corrupted[idx] ^= 0x01;
            let err = decode(&corrupted).unwrap_err();
            assert_eq!(err.category(), "protocol", "byte {idx} flip not caught");
        }
        // Flipping either checksum byte alone fails the same way.
        for idx in frame.len() - 2..frame.len() {
            let mut corrupted = frame.clone();
            corrupted[idx] ^= 0x80;
            assert!(decode(&corrupted).is_err());
        }
    }

    #[test]
    fn oversized_payload_is_rejected_on_encode() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        assert!(encode(0xFF, 0x01, &payload).is_err());
    }
}
