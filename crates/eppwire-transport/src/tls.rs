use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::DeadlineStream;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TLS handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on flushing `close_notify` during shutdown.
pub const CLOSE_NOTIFY_TIMEOUT: Duration = Duration::from_millis(500);

/// Dial parameters for the TCP leg of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialConfig {
    /// Timeout for each TCP connect attempt. `None` waits for the OS.
    pub connect_timeout: Option<Duration>,
    /// Timeout for the TLS handshake as a whole. `None` disables it.
    pub handshake_timeout: Option<Duration>,
    /// Set `TCP_NODELAY` on the socket.
    pub nodelay: bool,
    /// Name presented for SNI and certificate verification.
    /// Defaults to the host part of the server address.
    pub server_name: Option<String>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            nodelay: true,
            server_name: None,
        }
    }
}

#[derive(Clone)]
enum TrustAnchors {
    WebPki,
    Store(Arc<RootCertStore>),
}

#[derive(Clone)]
struct ClientIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: Arc<PrivateKeyDer<'static>>,
}

/// TLS client configuration.
///
/// The default trusts the Mozilla root set shipped by `webpki-roots` and
/// presents no client certificate. Registries that require certificate
/// pinning or a private CA must supply their own roots, or a complete
/// [`rustls::ClientConfig`] via [`TlsConfig::custom`].
#[derive(Clone)]
pub struct TlsConfig {
    trust: TrustAnchors,
    identity: Option<ClientIdentity>,
    custom: Option<Arc<ClientConfig>>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            trust: TrustAnchors::WebPki,
            identity: None,
            custom: None,
        }
    }
}

impl TlsConfig {
    /// Trust the `webpki-roots` set, no client certificate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the trust anchors with an explicit root store.
    pub fn with_root_store(mut self, roots: RootCertStore) -> Self {
        self.trust = TrustAnchors::Store(Arc::new(roots));
        self
    }

    /// Present a client certificate chain during the handshake.
    pub fn with_client_identity(
        mut self,
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        self.identity = Some(ClientIdentity {
            chain,
            key: Arc::new(key),
        });
        self
    }

    /// Use a fully caller-built rustls configuration as-is.
    pub fn custom(config: Arc<ClientConfig>) -> Self {
        Self {
            custom: Some(config),
            ..Self::default()
        }
    }

    /// Build the rustls client configuration.
    pub fn build(&self) -> Result<Arc<ClientConfig>> {
        if let Some(custom) = &self.custom {
            return Ok(Arc::clone(custom));
        }

        let roots = match &self.trust {
            TrustAnchors::WebPki => Arc::new(RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.into(),
            }),
            TrustAnchors::Store(store) => Arc::clone(store),
        };

        let builder =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(TransportError::TlsConfig)?
                .with_root_certificates(roots);

        let config = match &self.identity {
            Some(identity) => builder
                .with_client_auth_cert(identity.chain.clone(), identity.key.clone_key())
                .map_err(TransportError::TlsConfig)?,
            None => builder.with_no_client_auth(),
        };

        Ok(Arc::new(config))
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trust = match (&self.custom, &self.trust) {
            (Some(_), _) => "custom".to_string(),
            (None, TrustAnchors::WebPki) => "webpki-roots".to_string(),
            (None, TrustAnchors::Store(store)) => format!("{} roots", store.len()),
        };
        let mut dbg = f.debug_struct("TlsConfig");
        dbg.field("trust", &trust);
        if let Some(identity) = &self.identity {
            dbg.field(
                "client_identity",
                &format_args!("<{} certs, key redacted>", identity.chain.len()),
            );
        } else {
            dbg.field("client_identity", &Option::<()>::None);
        }
        dbg.finish()
    }
}

/// A client-side TLS stream over TCP.
pub struct TlsStream {
    inner: StreamOwned<ClientConnection, TcpStream>,
    peer: SocketAddr,
}

impl TlsStream {
    /// Remote address of the underlying TCP connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Negotiated TLS protocol version, once the handshake is complete.
    pub fn protocol_version(&self) -> Option<rustls::ProtocolVersion> {
        self.inner.conn.protocol_version()
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl DeadlineStream for TlsStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.sock.set_read_timeout(timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.sock.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.inner.conn.send_close_notify();
        let deadline = Instant::now() + CLOSE_NOTIFY_TIMEOUT;
        while self.inner.conn.wants_write() {
            let Some(left) = time_left(deadline) else {
                debug!(peer = %self.peer, "close_notify not flushed before deadline");
                break;
            };
            self.inner.sock.set_write_timeout(Some(left))?;
            match self.inner.conn.write_tls(&mut self.inner.sock) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    debug!(peer = %self.peer, error = %err, "close_notify not delivered");
                    break;
                }
            }
        }
        self.inner.sock.shutdown(Shutdown::Both)
    }
}

impl fmt::Debug for TlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsStream")
            .field("peer", &self.peer_addr())
            .field("protocol_version", &self.protocol_version())
            .finish()
    }
}

/// Dial `addr` (`host:port`) over TCP and complete a TLS handshake.
///
/// Returns only once the handshake has finished, so certificate problems
/// surface here rather than on the first read.
pub fn dial(addr: &str, dial_config: &DialConfig, tls_config: &TlsConfig) -> Result<TlsStream> {
    let name = match &dial_config.server_name {
        Some(name) => name.clone(),
        None => host_of(addr).to_string(),
    };
    let server_name = ServerName::try_from(name.clone())
        .map_err(|_| TransportError::InvalidServerName { name })?;
    let client_config = tls_config.build()?;

    let tcp = connect_tcp(addr, dial_config)?;
    let peer = tcp.peer_addr()?;

    let conn = ClientConnection::new(client_config, server_name)
        .map_err(TransportError::TlsConfig)?;
    let mut inner = StreamOwned::new(conn, tcp);
    handshake(&mut inner, non_zero(dial_config.handshake_timeout)).map_err(|source| {
        TransportError::Handshake {
            addr: addr.to_string(),
            source,
        }
    })?;

    inner.sock.set_read_timeout(None)?;
    inner.sock.set_write_timeout(None)?;

    let stream = TlsStream { inner, peer };
    info!(
        addr,
        %peer,
        version = ?stream.protocol_version(),
        "TLS connection established"
    );
    Ok(stream)
}

/// Drive the handshake to completion under one deadline covering every
/// record read and written, so a peer trickling bytes cannot stretch it.
fn handshake(
    inner: &mut StreamOwned<ClientConnection, TcpStream>,
    timeout: Option<Duration>,
) -> io::Result<()> {
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let expired = || {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("TLS handshake did not finish within {timeout:?}"),
        )
    };

    loop {
        if let Some(deadline) = deadline {
            let left = time_left(deadline).ok_or_else(expired)?;
            inner.sock.set_read_timeout(Some(left))?;
            inner.sock.set_write_timeout(Some(left))?;
        }

        if inner.conn.wants_write() {
            match inner.conn.write_tls(&mut inner.sock) {
                Ok(_) => {}
                Err(err) if retryable(&err, deadline.is_some()) => {}
                Err(err) => return Err(err),
            }
            continue;
        }
        if !inner.conn.is_handshaking() {
            return Ok(());
        }

        match inner.conn.read_tls(&mut inner.sock) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed the connection during the TLS handshake",
                ));
            }
            Ok(_) => {
                if let Err(err) = inner.conn.process_new_packets() {
                    // Best effort: let the peer see the alert.
                    let _ = inner.conn.write_tls(&mut inner.sock);
                    return Err(io::Error::new(io::ErrorKind::InvalidData, err));
                }
            }
            Err(err) if retryable(&err, deadline.is_some()) => {}
            Err(err) => return Err(err),
        }
    }
}

/// Timeouts loop back to the deadline check; interrupts always retry.
fn retryable(err: &io::Error, bounded: bool) -> bool {
    match err.kind() {
        io::ErrorKind::Interrupted => true,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => bounded,
        _ => false,
    }
}

fn time_left(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
}

fn connect_tcp(addr: &str, dial_config: &DialConfig) -> Result<TcpStream> {
    let candidates: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            addr: addr.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
        });
    }

    let mut last_err = None;
    for candidate in candidates {
        let attempt = match non_zero(dial_config.connect_timeout) {
            Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
            None => TcpStream::connect(candidate),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(dial_config.nodelay)?;
                debug!(addr, %candidate, "tcp connected");
                return Ok(stream);
            }
            Err(err) => {
                debug!(addr, %candidate, error = %err, "tcp connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr: addr.to_string(),
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
    })
}

fn non_zero(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|d| !d.is_zero())
}

/// Host part of a `host:port` address, without IPv6 brackets.
fn host_of(addr: &str) -> &str {
    let host = match addr.rsplit_once(':') {
        Some((host, port)) if !port.contains(']') => host,
        _ => addr,
    };
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}
