//! `tokio_util::codec` adapter for EPP framing.
//!
//! Deadlines are not part of the codec; wrap reads in `tokio::time::timeout`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, MAX_PAYLOAD_SIZE};
use crate::error::{FrameError, Result};

/// Async codec producing one [`Bytes`] payload per EPP frame.
#[derive(Debug, Clone)]
pub struct EppCodec {
    max_payload_size: usize,
}

impl EppCodec {
    /// Codec accepting payloads up to the wire limit.
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE)
    }

    /// Codec rejecting payloads larger than `max_payload_size`.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for EppCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EppCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Bytes> for EppCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        encode_frame(item.as_ref(), dst)
    }
}

impl Encoder<&[u8]> for EppCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(item, dst)
    }
}
