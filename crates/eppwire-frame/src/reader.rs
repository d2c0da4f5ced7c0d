use std::io::ErrorKind;

use bytes::{Bytes, BytesMut};
use eppwire_transport::DeadlineStream;
use tracing::trace;

use crate::codec::{payload_len, FrameConfig, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::{FrameError, Result};
use crate::timeout::{Deadline, Remaining, Timeout};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Read one complete frame and return its payload (blocking).
///
/// The deadline starts when this function is called and covers the header
/// and the whole payload. The stream's read timeout is overwritten on every
/// call.
pub fn read_message<S>(stream: &mut S, timeout: Timeout) -> Result<Bytes>
where
    S: DeadlineStream + ?Sized,
{
    read_message_limited(stream, timeout, MAX_PAYLOAD_SIZE)
}

/// Read one frame using the read timeout and payload limit of `config`.
pub fn read_message_with_config<S>(stream: &mut S, config: &FrameConfig) -> Result<Bytes>
where
    S: DeadlineStream + ?Sized,
{
    read_message_limited(stream, config.read_timeout, config.max_payload_size)
}

/// Read one frame, rejecting payloads larger than `max_payload` before any
/// payload byte is consumed.
pub fn read_message_limited<S>(
    stream: &mut S,
    timeout: Timeout,
    max_payload: usize,
) -> Result<Bytes>
where
    S: DeadlineStream + ?Sized,
{
    let deadline = Deadline::start(timeout);

    let mut header = [0u8; HEADER_SIZE];
    read_exact_by(stream, &mut header, &deadline)?;
    let len = payload_len(header, max_payload)?;

    // Grow with the data actually received instead of trusting the declared
    // length for the allocation.
    let mut payload = BytesMut::with_capacity(len.min(INITIAL_BUFFER_CAPACITY));
    while payload.len() < len {
        let start = payload.len();
        let want = (len - start).min(READ_CHUNK_SIZE);
        payload.resize(start + want, 0);
        read_exact_by(stream, &mut payload[start..], &deadline)?;
    }

    trace!(len, "frame read");
    Ok(payload.freeze())
}

fn read_exact_by<S>(stream: &mut S, buf: &mut [u8], deadline: &Deadline) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    let mut filled = 0usize;
    while filled < buf.len() {
        match deadline.remaining() {
            Remaining::Expired => return Err(FrameError::ReadTimeout(deadline.timeout())),
            Remaining::Left(left) => stream.set_read_timeout(Some(left))?,
            Remaining::Unbounded => stream.set_read_timeout(None)?,
        }

        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err)
                if deadline.is_bounded()
                    && matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                return Err(FrameError::ConnectionClosed)
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}
