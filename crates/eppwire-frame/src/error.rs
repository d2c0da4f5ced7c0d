use std::io::ErrorKind;
use std::time::Duration;

/// Errors that can occur while reading or writing EPP frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The length header declared fewer than 4 bytes, which cannot even
    /// cover the header itself.
    #[error("frame too short (declared total length {declared}, minimum 4)")]
    FrameTooShort { declared: u32 },

    /// The payload cannot be framed, or exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The read deadline expired before a complete frame arrived.
    #[error("read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// The write deadline expired before the frame was fully written.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The peer closed the stream before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns true for read and write deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::ReadTimeout(_) | FrameError::WriteTimeout(_))
    }

    /// Returns true if the stream is gone, either by orderly close or reset.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            FrameError::ConnectionClosed => true,
            FrameError::Io(err) => matches!(
                err.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
