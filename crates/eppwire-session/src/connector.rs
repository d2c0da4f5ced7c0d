use bytes::Bytes;
use eppwire_frame::{read_message_with_config, write_message_with_config, FrameConfig, FrameError};
use eppwire_transport::{dial, DeadlineStream, DialConfig, TlsConfig, TlsStream};
use tracing::{debug, info};

use crate::error::{Result, SessionError};

/// An established EPP connection.
///
/// Only obtainable through [`Connection::establish`] or [`connect`], both of
/// which consume the server greeting first. Holding a `Connection` therefore
/// means the greeting has been read.
pub struct Connection<S> {
    stream: S,
    frame: FrameConfig,
}

impl<S: DeadlineStream> Connection<S> {
    /// Read the greeting from a freshly opened stream.
    ///
    /// On failure the stream is shut down before the error is returned.
    pub fn establish(mut stream: S, frame: FrameConfig) -> Result<(Self, Bytes)> {
        match read_message_with_config(&mut stream, &frame) {
            Ok(greeting) => {
                debug!(len = greeting.len(), "greeting received");
                Ok((Self { stream, frame }, greeting))
            }
            Err(err) => {
                if let Err(close_err) = stream.shutdown() {
                    debug!(error = %close_err, "shutdown after failed greeting");
                }
                Err(SessionError::Greeting(err))
            }
        }
    }

    /// Write one request frame and read the matching response frame.
    pub fn exchange(&mut self, payload: &[u8]) -> std::result::Result<Bytes, FrameError> {
        write_message_with_config(&mut self.stream, &self.frame, payload)?;
        let response = read_message_with_config(&mut self.stream, &self.frame)?;
        debug!(
            request_len = payload.len(),
            response_len = response.len(),
            "exchange complete"
        );
        Ok(response)
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Shut the stream down. Consumes the connection; it cannot be reused.
    pub fn close(mut self) -> std::io::Result<()> {
        self.stream.shutdown()
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("stream", &self.stream)
            .field("frame", &self.frame)
            .finish()
    }
}

/// Dial `addr` over TLS and read the server greeting.
pub fn connect(
    addr: &str,
    dial_config: &DialConfig,
    tls_config: &TlsConfig,
    frame: FrameConfig,
) -> Result<(Connection<TlsStream>, Bytes)> {
    let stream = dial(addr, dial_config, tls_config)?;
    let (conn, greeting) = Connection::establish(stream, frame)?;
    info!(
        addr,
        peer = %conn.stream().peer_addr(),
        greeting_len = greeting.len(),
        "EPP connection established"
    );
    Ok((conn, greeting))
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Read;
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Duration;

    use eppwire_frame::{read_message, write_message, Timeout};

    use super::*;

    fn frame_config(ms: u64) -> FrameConfig {
        FrameConfig::uniform(Timeout::After(Duration::from_millis(ms)))
    }

    #[test]
    fn greeting_is_first_frame() {
        let (client, mut server) = UnixStream::pair().unwrap();
        write_message(&mut server, Timeout::Never, b"<greeting/>").unwrap();

        let (mut conn, greeting) = Connection::establish(client, frame_config(1_000)).unwrap();
        assert_eq!(greeting.as_ref(), b"<greeting/>");

        let peer = thread::spawn(move || {
            let request = read_message(&mut server, Timeout::Never).unwrap();
            assert_eq!(request.as_ref(), b"<hello/>");
            write_message(&mut server, Timeout::Never, b"<greeting again/>").unwrap();
        });

        assert_eq!(conn.exchange(b"<hello/>").unwrap().as_ref(), b"<greeting again/>");
        peer.join().unwrap();
    }

    #[test]
    fn silent_server_fails_greeting_and_closes_stream() {
        let (client, mut server) = UnixStream::pair().unwrap();

        let err = Connection::establish(client, frame_config(100)).unwrap_err();
        assert!(matches!(err, SessionError::Greeting(FrameError::ReadTimeout(_))));
        assert!(err.is_timeout());

        // Client side was shut down, so the server observes EOF.
        let mut buf = [0u8; 1];
        assert_eq!(server.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn garbage_greeting_is_rejected() {
        let (client, mut server) = UnixStream::pair().unwrap();
        std::io::Write::write_all(&mut server, &[0, 0, 0, 1]).unwrap();

        let err = Connection::establish(client, frame_config(1_000)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Greeting(FrameError::FrameTooShort { declared: 1 })
        ));
    }

    #[test]
    fn exchange_surfaces_peer_close() {
        let (client, mut server) = UnixStream::pair().unwrap();
        write_message(&mut server, Timeout::Never, b"<greeting/>").unwrap();
        let (mut conn, _) = Connection::establish(client, frame_config(1_000)).unwrap();

        let peer = thread::spawn(move || {
            let _ = read_message(&mut server, Timeout::Never).unwrap();
            drop(server);
        });

        let err = conn.exchange(b"<epp/>").unwrap_err();
        assert!(err.is_connection_closed(), "unexpected error: {err:?}");
        peer.join().unwrap();
    }

    #[test]
    fn connect_refused_is_dial_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(
            &addr,
            &DialConfig::default(),
            &TlsConfig::new(),
            FrameConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Dial(_)));
    }
}
