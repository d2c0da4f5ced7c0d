use std::net::Ipv6Addr;
use std::path::Path;

use bytes::Bytes;
use eppwire_frame::Timeout;
use eppwire_session::{Session, SessionConfig};
use eppwire_transport::rustls::pki_types::pem::PemObject;
use eppwire_transport::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use eppwire_transport::rustls::RootCertStore;
use eppwire_transport::{DialConfig, TlsConfig};
use tracing::debug;

use crate::cmd::ConnectArgs;
use crate::exit::{session_error, CliError, CliResult, DATA_INVALID, USAGE};

/// IANA-registered EPP port.
pub const DEFAULT_PORT: u16 = 700;

/// Dial the server described by `args` and return the session with its greeting.
pub fn open(args: &ConnectArgs, mut config: SessionConfig) -> CliResult<(Session, Bytes)> {
    let addr = server_addr(&args.server)?;
    let timeout = parse_timeout(&args.timeout)?;

    config.timeout = timeout;
    config.dial = DialConfig {
        connect_timeout: timeout.as_duration(),
        handshake_timeout: timeout.as_duration(),
        server_name: args.server_name.clone(),
        ..DialConfig::default()
    };
    config.tls = tls_config(args)?;

    let mut session = Session::new(config);
    let greeting = session
        .connect(&addr)
        .map_err(|err| session_error(&format!("connect to {addr}"), err))?;
    debug!(
        addr = %addr,
        peer = ?session.stream().map(|stream| stream.peer_addr()),
        "session open"
    );
    Ok((session, greeting))
}

/// Append the default port when `server` has none. A bare IPv6 literal is
/// bracketed first; other unbracketed forms with several colons are rejected.
pub fn server_addr(server: &str) -> CliResult<String> {
    let server = server.trim();
    if server.is_empty() {
        return Err(CliError::new(USAGE, "server address must not be empty"));
    }
    if server.parse::<Ipv6Addr>().is_ok() {
        return Ok(format!("[{server}]:{DEFAULT_PORT}"));
    }
    let has_port = match server.rfind(']') {
        Some(close) => server[close..].contains(':'),
        None if server.matches(':').count() > 1 => {
            return Err(CliError::new(
                USAGE,
                format!("ambiguous server address {server}: bracket IPv6 hosts, e.g. [::1]:700"),
            ));
        }
        None => server.contains(':'),
    };
    if has_port {
        Ok(server.to_string())
    } else {
        Ok(format!("{server}:{DEFAULT_PORT}"))
    }
}

/// Parse `30s`, `500ms` or bare seconds. `0` means no deadline.
pub fn parse_timeout(input: &str) -> CliResult<Timeout> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    Ok(match (value, millis) {
        (0, _) => Timeout::Never,
        (ms, true) => Timeout::After(std::time::Duration::from_millis(ms)),
        (secs, false) => Timeout::from_secs(secs),
    })
}

fn tls_config(args: &ConnectArgs) -> CliResult<TlsConfig> {
    let mut tls = TlsConfig::new();
    if let Some(path) = &args.ca_file {
        tls = tls.with_root_store(load_roots(path)?);
    }
    if let (Some(cert), Some(key)) = (&args.cert, &args.key) {
        let chain = load_certs(cert)?;
        let key = PrivateKeyDer::from_pem_file(key).map_err(|err| pem_error(key, err))?;
        tls = tls.with_client_identity(chain, key);
    }
    Ok(tls)
}

fn load_certs(path: &Path) -> CliResult<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|err| pem_error(path, err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| pem_error(path, err))?;
    if certs.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{}: no certificates found", path.display()),
        ));
    }
    Ok(certs)
}

fn load_roots(path: &Path) -> CliResult<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert).map_err(|err| {
            CliError::new(DATA_INVALID, format!("{}: {err}", path.display()))
        })?;
    }
    Ok(roots)
}

fn pem_error(path: &Path, err: impl std::fmt::Display) -> CliError {
    CliError::new(DATA_INVALID, format!("{}: {err}", path.display()))
}
