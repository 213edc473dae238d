//! Little-endian field readers shared by the catalog decoders.
//!
//! Callers check payload length once via [`ensure_len`]; after that the
//! indexed reads below cannot go out of bounds.

use crate::error::{Error, Result};

pub(crate) fn ensure_len(kind: &'static str, need: usize, payload: &[u8]) -> Result<()> {
    if payload.len() < need {
        return Err(Error::protocol(format!(
            "{kind} payload too short: need {need} bytes, got {}",
            payload.len()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_exact_len(kind: &'static str, need: usize, payload: &[u8]) -> Result<()> {
    if payload.len() != need {
        return Err(Error::protocol(format!(
            "{kind} payload must be exactly {need} bytes, got {}",
            payload.len()
        )));
    }
    Ok(())
}

pub(crate) fn u16_at(payload: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([payload[offset], payload[offset + 1]])
}

pub(crate) fn i16_at(payload: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([payload[offset], payload[offset + 1]])
}

pub(crate) fn u32_at(payload: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

pub(crate) fn i32_at(payload: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}
