use std::fmt;

/// Protocol version declared at login.
pub const EPP_VERSION: &str = "1.0";

/// Response language requested at login.
pub const EPP_LANGUAGE: &str = "en";

/// Object namespaces the client declares it will manage.
pub const OBJECT_URIS: [&str; 3] = [
    "urn:ietf:params:xml:ns:domain-1.0",
    "urn:ietf:params:xml:ns:contact-1.0",
    "urn:ietf:params:xml:ns:host-1.0",
];

/// Extension namespaces the client declares it supports.
pub const EXTENSION_URIS: [&str; 2] = [
    "urn:ietf:params:xml:ns:secDNS-1.0",
    "urn:ietf:params:xml:ns:secDNS-1.1",
];

/// `<options>` element of a login command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    pub version: String,
    pub language: String,
}

/// `<svcs>` element of a login command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginServices {
    pub object_uris: Vec<String>,
    pub extension_uris: Vec<String>,
}

/// Credentials and capability declaration sent once per session.
///
/// Built fresh for every login and dropped after encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginEnvelope {
    pub client_id: String,
    /// Sent in clear inside the TLS stream; never logged.
    pub password: String,
    pub options: LoginOptions,
    pub services: LoginServices,
}

impl LoginEnvelope {
    /// Envelope with the fixed version, language and capability sets.
    pub fn new(client_id: &str, password: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            password: password.to_string(),
            options: LoginOptions {
                version: EPP_VERSION.to_string(),
                language: EPP_LANGUAGE.to_string(),
            },
            services: LoginServices {
                object_uris: OBJECT_URIS.iter().map(|uri| uri.to_string()).collect(),
                extension_uris: EXTENSION_URIS.iter().map(|uri| uri.to_string()).collect(),
            },
        }
    }
}

impl fmt::Debug for LoginEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginEnvelope")
            .field("client_id", &self.client_id)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .field("options", &self.options)
            .field("services", &self.services)
            .finish()
    }
}
