//! EPP (RFC 5730) client transport and session layer.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP dialing, TLS configuration and streams with deadlines
//! - [`frame`]: the 4-byte total-length framing with bounded reads and writes
//! - [`session`]: connect, greeting, login and request/response exchange
//!   (behind the default `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use eppwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use eppwire_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use eppwire_session::*;
}
