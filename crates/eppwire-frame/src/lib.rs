//! RFC 5730 length-prefixed message framing.
//!
//! Every EPP message on the wire is:
//! - A 4-byte big-endian total length, counting the header itself
//! - The payload (an XML document), `total length - 4` bytes long
//!
//! Reads and writes take an explicit [`Timeout`] that becomes an absolute
//! deadline for the whole message. No XML or EPP semantics live here.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod timeout;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::EppCodec;
pub use codec::{
    decode_frame, encode_frame, frame_header, payload_len, FrameConfig, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::{read_message, read_message_limited, read_message_with_config};
pub use timeout::Timeout;
pub use writer::{write_message, write_message_with_config};
