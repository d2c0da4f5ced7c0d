/// Errors that can occur while establishing or driving a transport stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Name resolution for the server address failed.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Every resolved address refused or timed out the TCP connect.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The server name could not be used for TLS verification.
    #[error("invalid TLS server name '{name}'")]
    InvalidServerName { name: String },

    /// TLS configuration could not be built.
    #[error("TLS configuration error: {0}")]
    TlsConfig(#[source] rustls::Error),

    /// The TLS handshake failed (including certificate validation).
    #[error("TLS handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns true if the failure was caused by an expired timeout.
    pub fn is_timeout(&self) -> bool {
        let io = match self {
            TransportError::Resolve { source, .. }
            | TransportError::Connect { source, .. }
            | TransportError::Handshake { source, .. } => source,
            TransportError::Io(err) => err,
            _ => return false,
        };
        matches!(
            io.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
