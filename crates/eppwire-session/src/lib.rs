//! EPP client session lifecycle.
//!
//! Dial a server over TLS, read its greeting, authenticate, then exchange
//! opaque request/response documents one at a time. A [`Session`] owns at
//! most one connection and closes it on the first failed exchange.

pub mod connector;
pub mod encode;
pub mod error;
pub mod login;
pub mod session;

pub use connector::{connect, Connection};
pub use encode::{
    client_xml_attributes, Command, CommandEncoder, Request, XmlAttribute, XmlEncoder,
    EPP_NAMESPACE, EPP_SCHEMA_LOCATION, XSI_NAMESPACE,
};
pub use error::{EncodeError, Result, SessionError};
pub use login::{
    LoginEnvelope, LoginOptions, LoginServices, EPP_LANGUAGE, EPP_VERSION, EXTENSION_URIS,
    OBJECT_URIS,
};
pub use session::{Session, SessionConfig, DEFAULT_TIMEOUT};
