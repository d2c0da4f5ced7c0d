use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::timeout::Timeout;

/// Frame header: total length (4, big-endian).
pub const HEADER_SIZE: usize = 4;

/// Largest payload the 32-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - HEADER_SIZE;

/// Build the length header for a payload of `payload_len` bytes.
///
/// Wire format (RFC 5730 / RFC 5734 section 4):
/// ```text
/// ┌──────────────────────┬──────────────────────────┐
/// │ Total length (4B BE) │ Payload                  │
/// │ = 4 + payload length │ (total length - 4 bytes) │
/// └──────────────────────┴──────────────────────────┘
/// ```
pub fn frame_header(payload_len: usize) -> Result<[u8; HEADER_SIZE]> {
    let total = payload_len
        .checked_add(HEADER_SIZE)
        .and_then(|total| u32::try_from(total).ok())
        .ok_or(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        })?;
    Ok(total.to_be_bytes())
}

/// Validate a received length header and return the payload length it
/// announces.
pub fn payload_len(header: [u8; HEADER_SIZE], max_payload: usize) -> Result<usize> {
    let declared = u32::from_be_bytes(header);
    let len = (declared as usize)
        .checked_sub(HEADER_SIZE)
        .ok_or(FrameError::FrameTooShort { declared })?;
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }
    Ok(len)
}

/// Encode a payload into the wire format.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = frame_header(payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes and returns the payload.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let Some(header) = src.get(..HEADER_SIZE) else {
        return Ok(None);
    };
    let header: [u8; HEADER_SIZE] = [header[0], header[1], header[2], header[3]];
    let len = payload_len(header, max_payload)?;

    let total = HEADER_SIZE + len;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(len).freeze()))
}

/// Configuration for framed I/O on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Bound applied to every framed read.
    pub read_timeout: Timeout,
    /// Bound applied to every framed write.
    pub write_timeout: Timeout,
    /// Largest payload accepted from the peer. Default: the wire limit.
    pub max_payload_size: usize,
}

impl FrameConfig {
    /// Same timeout for reads and writes, default payload limit.
    pub fn uniform(timeout: Timeout) -> Self {
        Self {
            read_timeout: timeout,
            write_timeout: timeout,
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            read_timeout: Timeout::Never,
            write_timeout: Timeout::Never,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }
}
