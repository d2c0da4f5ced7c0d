use eppwire_frame::FrameError;
use eppwire_transport::TransportError;

/// A command could not be serialized into an EPP XML document.
#[derive(Debug, thiserror::Error)]
#[error("encode failed: {message}")]
pub struct EncodeError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error from a caller-supplied serializer.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// DNS, TCP or TLS failure while dialing the server.
    #[error("connect failed: {0}")]
    Dial(#[from] TransportError),

    /// The server greeting did not arrive intact; the stream was closed.
    #[error("greeting failed: {0}")]
    Greeting(#[source] FrameError),

    /// Exchange failure after the session was established; the stream was closed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The command could not be serialized; nothing was sent.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// No live connection: never connected, closed, or torn down after a failure.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` was called while a connection is still live.
    #[error("session is already connected")]
    AlreadyConnected,

    /// Closing the underlying stream reported an error.
    #[error("close failed: {0}")]
    Close(#[source] std::io::Error),
}

impl SessionError {
    /// Returns true if a deadline expired: dial, greeting, write or read.
    pub fn is_timeout(&self) -> bool {
        match self {
            SessionError::Dial(err) => err.is_timeout(),
            SessionError::Greeting(err) | SessionError::Frame(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if the peer closed or reset the stream.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            SessionError::Greeting(err) | SessionError::Frame(err) => err.is_connection_closed(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeout_classification_spans_layers() {
        assert!(SessionError::Greeting(FrameError::ReadTimeout(Duration::from_secs(1))).is_timeout());
        assert!(SessionError::Frame(FrameError::WriteTimeout(Duration::from_secs(1))).is_timeout());
        assert!(SessionError::Dial(TransportError::Connect {
            addr: "epp.example:700".into(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        })
        .is_timeout());
        assert!(!SessionError::NotConnected.is_timeout());
        assert!(!SessionError::Encode(EncodeError::new("bad")).is_timeout());
    }

    #[test]
    fn closed_classification() {
        assert!(SessionError::Frame(FrameError::ConnectionClosed).is_connection_closed());
        assert!(SessionError::Greeting(FrameError::ConnectionClosed).is_connection_closed());
        assert!(!SessionError::NotConnected.is_connection_closed());
    }

    #[test]
    fn encode_error_keeps_source() {
        let err = EncodeError::with_source("login", io::Error::other("boom"));
        assert_eq!(err.message(), "login");
        assert_eq!(err.source().unwrap().to_string(), "boom");
        assert_eq!(SessionError::from(err).to_string(), "encode failed: login");
    }
}
