use std::io::ErrorKind;

use bytes::{BufMut, BytesMut};
use eppwire_transport::DeadlineStream;
use tracing::trace;

use crate::codec::{frame_header, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::timeout::{Deadline, Remaining, Timeout};

/// Write one complete frame (blocking).
///
/// Header and payload are encoded into one buffer and written as a single
/// logical write under one deadline. If the stream fails part-way the error
/// is returned as-is; the remaining bytes are never re-sent, since the frame
/// boundary on the wire is already lost.
pub fn write_message<S>(stream: &mut S, timeout: Timeout, payload: &[u8]) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    let mut buf = frame_buffer(payload.len())?;
    buf.put_slice(payload);

    let deadline = Deadline::start(timeout);
    write_all_by(stream, &buf, &deadline)?;
    flush_by(stream, &deadline)?;

    trace!(len = payload.len(), "frame written");
    Ok(())
}

/// Write one frame using the write timeout of `config`.
pub fn write_message_with_config<S>(
    stream: &mut S,
    config: &FrameConfig,
    payload: &[u8],
) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    write_message(stream, config.write_timeout, payload)
}

/// Header-prefixed buffer sized for the whole frame. The length is
/// validated before anything is allocated.
fn frame_buffer(payload_len: usize) -> Result<BytesMut> {
    let header = frame_header(payload_len)?;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload_len);
    buf.put_slice(&header);
    Ok(buf)
}

fn apply_write_deadline<S>(stream: &mut S, deadline: &Deadline) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    match deadline.remaining() {
        Remaining::Expired => Err(FrameError::WriteTimeout(deadline.timeout())),
        Remaining::Left(left) => Ok(stream.set_write_timeout(Some(left))?),
        Remaining::Unbounded => Ok(stream.set_write_timeout(None)?),
    }
}

fn write_all_by<S>(stream: &mut S, buf: &[u8], deadline: &Deadline) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    let mut offset = 0usize;
    while offset < buf.len() {
        apply_write_deadline(stream, deadline)?;
        match stream.write(&buf[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err)
                if deadline.is_bounded()
                    && matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn flush_by<S>(stream: &mut S, deadline: &Deadline) -> Result<()>
where
    S: DeadlineStream + ?Sized,
{
    loop {
        apply_write_deadline(stream, deadline)?;
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err)
                if deadline.is_bounded()
                    && matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
