use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use eppwire_frame::{FrameConfig, FrameError, Timeout, MAX_PAYLOAD_SIZE};
use eppwire_transport::{DeadlineStream, DialConfig, TlsConfig, TlsStream};
use tracing::{debug, info, warn};

use crate::connector::{self, Connection};
use crate::encode::{client_xml_attributes, Command, CommandEncoder, Request, XmlEncoder};
use crate::error::{Result, SessionError};
use crate::login::LoginEnvelope;

/// Default bound on the greeting read and on each request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Trust anchors and optional client certificate.
    pub tls: TlsConfig,
    /// TCP connect and TLS handshake bounds, server name override.
    pub dial: DialConfig,
    /// Applies separately to the greeting read, each request write and each
    /// response read.
    pub timeout: Timeout,
    /// Largest greeting or response accepted from the server.
    pub max_payload_size: usize,
    /// When set, login/logout carry `<clTRID>{prefix}-{n}</clTRID>`.
    pub transaction_id_prefix: Option<String>,
}

impl SessionConfig {
    /// Set the I/O timeout from whole seconds; `0` disables the deadline.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Timeout::from_secs(secs);
        self
    }

    fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            ..FrameConfig::uniform(self.timeout)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            dial: DialConfig::default(),
            timeout: Timeout::After(DEFAULT_TIMEOUT),
            max_payload_size: MAX_PAYLOAD_SIZE,
            transaction_id_prefix: None,
        }
    }
}

/// A client session with one EPP server.
///
/// Holds at most one live connection. Any failure while talking to the
/// server closes the connection; later calls return
/// [`SessionError::NotConnected`] until `connect` succeeds again.
pub struct Session<S = TlsStream> {
    config: SessionConfig,
    encoder: Arc<dyn CommandEncoder>,
    conn: Option<Connection<S>>,
    next_transaction: u64,
}

impl<S: DeadlineStream> Session<S> {
    /// Unconnected session using the built-in XML encoder.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            encoder: Arc::new(XmlEncoder),
            conn: None,
            next_transaction: 1,
        }
    }

    /// Replace the command encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn CommandEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// The underlying stream, while connected.
    pub fn stream(&self) -> Option<&S> {
        self.conn.as_ref().map(Connection::stream)
    }

    /// Adopt an already-open stream and read the server greeting from it.
    pub fn connect_stream(&mut self, stream: S) -> Result<Bytes> {
        if self.conn.is_some() {
            return Err(SessionError::AlreadyConnected);
        }
        let (conn, greeting) = Connection::establish(stream, self.config.frame_config())?;
        self.conn = Some(conn);
        Ok(greeting)
    }

    /// Send one pre-serialized request and return the raw response.
    pub fn send(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.with_connection(|conn| conn.exchange(payload))
    }

    /// Authenticate with `client_id` and `password`, declaring the fixed
    /// object and extension namespaces.
    ///
    /// An encoding failure returns [`SessionError::Encode`] without touching
    /// the connection.
    pub fn login(&mut self, client_id: &str, password: &str) -> Result<Bytes> {
        let envelope = LoginEnvelope::new(client_id, password);
        let payload = self.encode(Command::Login(&envelope))?;
        drop(envelope);

        let response = self.send(&payload)?;
        info!(client_id, "login response received");
        Ok(response)
    }

    /// Send `<hello/>`; the server answers with a fresh greeting.
    pub fn hello(&mut self) -> Result<Bytes> {
        let payload = self.encode(Command::Hello)?;
        self.send(&payload)
    }

    /// Send `<logout/>` and close the connection whatever the outcome.
    pub fn logout(&mut self) -> Result<Bytes> {
        let payload = self.encode(Command::Logout)?;
        let response = self.send(&payload);
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.close() {
                debug!(error = %err, "close after logout");
            }
        }
        info!("logged out");
        response
    }

    /// Close the connection. Calling this on an unconnected session is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(SessionError::Close)?;
                debug!("session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn encode(&mut self, command: Command<'_>) -> Result<Bytes> {
        let transaction_id = self.transaction_id(&command);
        let request = Request {
            command,
            transaction_id: transaction_id.as_deref(),
        };
        let encoded = self.encoder.encode(&request, &client_xml_attributes())?;
        debug!(
            command = request.command.name(),
            transaction_id = request.transaction_id,
            len = encoded.len(),
            "request encoded"
        );
        Ok(encoded)
    }

    fn transaction_id(&mut self, command: &Command<'_>) -> Option<String> {
        if matches!(command, Command::Hello) {
            return None;
        }
        let prefix = self.config.transaction_id_prefix.as_deref()?;
        let id = format!("{prefix}-{}", self.next_transaction);
        self.next_transaction += 1;
        Some(id)
    }

    /// Run `op` on the live connection; on any error, drop the connection
    /// before returning. Close errors during teardown are logged only.
    fn with_connection<T>(
        &mut self,
        op: impl FnOnce(&mut Connection<S>) -> std::result::Result<T, FrameError>,
    ) -> Result<T> {
        let conn = self.conn.as_mut().ok_or(SessionError::NotConnected)?;
        match op(conn) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, "exchange failed; closing connection");
                if let Some(conn) = self.conn.take() {
                    if let Err(close_err) = conn.close() {
                        debug!(error = %close_err, "close after failed exchange");
                    }
                }
                Err(SessionError::Frame(err))
            }
        }
    }
}

impl Session<TlsStream> {
    /// Dial `addr` (`host:port`) over TLS and return the server greeting.
    pub fn connect(&mut self, addr: &str) -> Result<Bytes> {
        if self.conn.is_some() {
            return Err(SessionError::AlreadyConnected);
        }
        let (conn, greeting) = connector::connect(
            addr,
            &self.config.dial,
            &self.config.tls,
            self.config.frame_config(),
        )?;
        self.conn = Some(conn);
        Ok(greeting)
    }
}

impl Default for Session<TlsStream> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<S: fmt::Debug> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("connection", &self.conn)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Read;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use eppwire_frame::{read_message, write_message};

    use super::*;
    use crate::encode::XmlAttribute;
    use crate::error::EncodeError;

    const GREETING: &[u8] = b"<epp><greeting/></epp>";

    fn config(ms: u64) -> SessionConfig {
        SessionConfig {
            timeout: Timeout::After(Duration::from_millis(ms)),
            ..SessionConfig::default()
        }
    }

    fn connected(cfg: SessionConfig) -> (Session<UnixStream>, UnixStream) {
        let (client, mut server) = UnixStream::pair().unwrap();
        write_message(&mut server, Timeout::Never, GREETING).unwrap();
        let mut session = Session::new(cfg);
        let greeting = session.connect_stream(client).unwrap();
        assert_eq!(greeting.as_ref(), GREETING);
        (session, server)
    }

    #[test]
    fn timeout_secs_zero_means_no_deadline() {
        let cfg = SessionConfig::default().with_timeout_secs(0);
        assert_eq!(cfg.timeout, Timeout::Never);
        assert_eq!(cfg.frame_config().read_timeout, Timeout::Never);

        let cfg = SessionConfig::default().with_timeout_secs(5);
        assert_eq!(cfg.frame_config().write_timeout, Timeout::After(Duration::from_secs(5)));
        assert_eq!(cfg.frame_config().max_payload_size, MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn send_before_connect_is_not_connected() {
        let mut session: Session<UnixStream> = Session::new(SessionConfig::default());
        assert!(matches!(session.send(b"<epp/>"), Err(SessionError::NotConnected)));
        assert!(matches!(session.hello(), Err(SessionError::NotConnected)));
        assert!(!session.is_connected());
    }

    #[test]
    fn send_returns_response() {
        let (mut session, mut server) = connected(config(1_000));

        let peer = thread::spawn(move || {
            let request = read_message(&mut server, Timeout::Never).unwrap();
            write_message(&mut server, Timeout::Never, &request).unwrap();
            server
        });

        let response = session.send(b"<epp><check/></epp>").unwrap();
        assert_eq!(response.as_ref(), b"<epp><check/></epp>");
        assert!(session.is_connected());
        peer.join().unwrap();
    }

    #[test]
    fn read_timeout_closes_connection() {
        let (mut session, mut server) = connected(config(100));

        let err = session.send(b"<epp/>").unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err:?}");
        assert!(!session.is_connected());
        assert!(matches!(session.send(b"<epp/>"), Err(SessionError::NotConnected)));

        // The request made it out; then the client shut the stream down.
        assert_eq!(read_message(&mut server, Timeout::Never).unwrap().as_ref(), b"<epp/>");
        let mut buf = [0u8; 1];
        assert_eq!(server.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn peer_close_closes_connection() {
        let (mut session, server) = connected(config(1_000));
        drop(server);

        let err = session.send(b"<epp/>").unwrap_err();
        assert!(matches!(err, SessionError::Frame(_)));
        assert!(!session.is_connected());
    }

    #[test]
    fn close_is_idempotent() {
        let (mut session, _server) = connected(config(1_000));
        session.close().unwrap();
        session.close().unwrap();
        assert!(matches!(session.send(b"<epp/>"), Err(SessionError::NotConnected)));
    }

    #[test]
    fn second_connect_rejected_while_live() {
        let (mut session, _server) = connected(config(1_000));
        let (other, _other_peer) = UnixStream::pair().unwrap();

        let err = session.connect_stream(other).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyConnected));
        assert!(session.is_connected());
    }

    #[test]
    fn reconnect_after_close() {
        let (mut session, _server) = connected(config(1_000));
        session.close().unwrap();

        let (client, mut server) = UnixStream::pair().unwrap();
        write_message(&mut server, Timeout::Never, b"<epp><greeting id=\"2\"/></epp>").unwrap();
        let greeting = session.connect_stream(client).unwrap();
        assert_eq!(greeting.as_ref(), b"<epp><greeting id=\"2\"/></epp>");
    }

    #[test]
    fn failed_greeting_leaves_session_unconnected() {
        let (client, _server) = UnixStream::pair().unwrap();
        let mut session = Session::new(config(100));

        let err = session.connect_stream(client).unwrap_err();
        assert!(matches!(err, SessionError::Greeting(FrameError::ReadTimeout(_))));
        assert!(!session.is_connected());
    }

    #[test]
    fn oversized_greeting_rejected() {
        let (client, mut server) = UnixStream::pair().unwrap();
        write_message(&mut server, Timeout::Never, &[b'x'; 64]).unwrap();
        let mut session = Session::new(SessionConfig {
            max_payload_size: 16,
            ..config(1_000)
        });

        let err = session.connect_stream(client).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Greeting(FrameError::PayloadTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn login_sends_encoded_envelope() {
        let (mut session, mut server) = connected(config(1_000));

        let peer = thread::spawn(move || {
            let request = read_message(&mut server, Timeout::Never).unwrap();
            write_message(&mut server, Timeout::Never, b"<epp><response/></epp>").unwrap();
            String::from_utf8(request.to_vec()).unwrap()
        });

        let response = session.login("registrar", "s3cret!!").unwrap();
        assert_eq!(response.as_ref(), b"<epp><response/></epp>");

        let request = peer.join().unwrap();
        assert!(request.contains("xmlns=\"urn:ietf:params:xml:ns:epp-1.0\""));
        assert!(request.contains("<clID>registrar</clID><pw>s3cret!!</pw>"));
        assert!(request.contains("<objURI>urn:ietf:params:xml:ns:host-1.0</objURI>"));
        assert!(request.contains("<extURI>urn:ietf:params:xml:ns:secDNS-1.1</extURI>"));
        assert!(!request.contains("clTRID"));
    }

    #[test]
    fn transaction_ids_increment() {
        let (mut session, mut server) = connected(SessionConfig {
            transaction_id_prefix: Some("REG".into()),
            ..config(1_000)
        });

        let peer = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..3 {
                let request = read_message(&mut server, Timeout::Never).unwrap();
                seen.push(String::from_utf8(request.to_vec()).unwrap());
                write_message(&mut server, Timeout::Never, b"<epp/>").unwrap();
            }
            seen
        });

        session.login("registrar", "s3cret!!").unwrap();
        session.hello().unwrap();
        session.logout().unwrap();

        let seen = peer.join().unwrap();
        assert!(seen[0].contains("<clTRID>REG-1</clTRID>"));
        assert!(!seen[1].contains("clTRID"));
        assert!(seen[2].contains("<logout/><clTRID>REG-2</clTRID>"));
    }

    #[test]
    fn logout_closes_even_on_success() {
        let (mut session, mut server) = connected(config(1_000));

        let peer = thread::spawn(move || {
            let request = read_message(&mut server, Timeout::Never).unwrap();
            write_message(&mut server, Timeout::Never, b"<epp><response code=\"1500\"/></epp>")
                .unwrap();
            request
        });

        let response = session.logout().unwrap();
        assert_eq!(response.as_ref(), b"<epp><response code=\"1500\"/></epp>");
        assert!(!session.is_connected());
        assert!(String::from_utf8_lossy(&peer.join().unwrap()).contains("<logout/>"));
    }

    struct FailingEncoder {
        calls: AtomicUsize,
    }

    impl CommandEncoder for FailingEncoder {
        fn encode(
            &self,
            _request: &Request<'_>,
            _attributes: &[XmlAttribute],
        ) -> std::result::Result<Bytes, EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EncodeError::new("unsupported"))
        }
    }

    #[test]
    fn encode_failure_sends_nothing_and_keeps_connection() {
        let (session, mut server) = connected(config(1_000));
        let encoder = Arc::new(FailingEncoder {
            calls: AtomicUsize::new(0),
        });
        let mut session = session.with_encoder(encoder.clone());

        let err = session.login("registrar", "s3cret!!").unwrap_err();
        assert!(matches!(err, SessionError::Encode(_)));
        assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
        assert!(session.is_connected());

        server
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let mut buf = [0u8; 1];
        let read = server.read(&mut buf);
        assert!(read.is_err(), "server unexpectedly received {read:?}");
    }

    #[test]
    fn debug_shows_config_and_connection() {
        let (session, _server) = connected(config(1_000));
        let dbg = format!("{session:?}");
        assert!(dbg.contains("SessionConfig"));
        assert!(dbg.contains("Connection"));
        assert!(!dbg.contains("greeting"));
    }
}
