//! TCP/TLS transport for EPP clients.
//!
//! Provides the connected stream types the upper layers build on:
//! - [`DeadlineStream`], the blocking `Read + Write` capability with
//!   per-direction timeouts that the framer requires
//! - [`dial`], which resolves, connects and completes a TLS handshake
//! - [`TlsConfig`] and [`DialConfig`], explicit configuration values whose
//!   defaults are applied by their constructors
//!
//! This is the lowest layer of eppwire. It knows nothing about frames or XML.

pub mod error;
pub mod tls;
pub mod traits;

pub use error::{Result, TransportError};
pub use tls::{dial, DialConfig, TlsConfig, TlsStream};
pub use traits::DeadlineStream;

/// Re-export of the TLS library, for building root stores and certificates.
pub use rustls;
