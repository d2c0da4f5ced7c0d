//! Command serialization boundary.
//!
//! The session never builds XML itself: it hands a [`Request`] and the
//! standard root attributes to a [`CommandEncoder`]. [`XmlEncoder`] is the
//! built-in implementation for the handful of commands the session issues.

use std::fmt::Write as _;

use bytes::Bytes;

use crate::error::EncodeError;
use crate::login::LoginEnvelope;

pub const EPP_NAMESPACE: &str = "urn:ietf:params:xml:ns:epp-1.0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const EPP_SCHEMA_LOCATION: &str = "urn:ietf:params:xml:ns:epp-1.0 epp-1.0.xsd";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n";

/// One attribute on the `<epp>` root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: &'static str,
    pub value: &'static str,
}

/// Root attributes every client document carries.
pub fn client_xml_attributes() -> Vec<XmlAttribute> {
    vec![
        XmlAttribute {
            name: "xmlns",
            value: EPP_NAMESPACE,
        },
        XmlAttribute {
            name: "xmlns:xsi",
            value: XSI_NAMESPACE,
        },
        XmlAttribute {
            name: "xsi:schemaLocation",
            value: EPP_SCHEMA_LOCATION,
        },
    ]
}

/// Commands issued by the session itself.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    Login(&'a LoginEnvelope),
    Logout,
    Hello,
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login(_) => "login",
            Command::Logout => "logout",
            Command::Hello => "hello",
        }
    }
}

/// A command plus the optional client transaction identifier.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub command: Command<'a>,
    /// Emitted as `<clTRID>`; ignored for `<hello/>`, which has no command wrapper.
    pub transaction_id: Option<&'a str>,
}

impl<'a> Request<'a> {
    pub fn new(command: Command<'a>) -> Self {
        Self {
            command,
            transaction_id: None,
        }
    }
}

/// Serializes session commands into complete EPP documents.
pub trait CommandEncoder: Send + Sync {
    fn encode(&self, request: &Request<'_>, attributes: &[XmlAttribute])
        -> Result<Bytes, EncodeError>;
}

/// Built-in encoder producing compact RFC 5730 XML.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder;

impl CommandEncoder for XmlEncoder {
    fn encode(
        &self,
        request: &Request<'_>,
        attributes: &[XmlAttribute],
    ) -> Result<Bytes, EncodeError> {
        let mut doc = String::with_capacity(512);
        doc.push_str(XML_DECLARATION);
        doc.push_str("<epp");
        for attr in attributes {
            let _ = write!(doc, " {}=\"", attr.name);
            push_escaped(&mut doc, attr.value, attr.name)?;
            doc.push('"');
        }
        doc.push('>');

        match request.command {
            Command::Hello => doc.push_str("<hello/>"),
            Command::Logout => {
                doc.push_str("<command><logout/>");
                push_transaction_id(&mut doc, request.transaction_id)?;
                doc.push_str("</command>");
            }
            Command::Login(login) => {
                doc.push_str("<command><login>");
                push_element(&mut doc, "clID", &login.client_id)?;
                push_element(&mut doc, "pw", &login.password)?;
                doc.push_str("<options>");
                push_element(&mut doc, "version", &login.options.version)?;
                push_element(&mut doc, "lang", &login.options.language)?;
                doc.push_str("</options><svcs>");
                for uri in &login.services.object_uris {
                    push_element(&mut doc, "objURI", uri)?;
                }
                if !login.services.extension_uris.is_empty() {
                    doc.push_str("<svcExtension>");
                    for uri in &login.services.extension_uris {
                        push_element(&mut doc, "extURI", uri)?;
                    }
                    doc.push_str("</svcExtension>");
                }
                doc.push_str("</svcs></login>");
                push_transaction_id(&mut doc, request.transaction_id)?;
                doc.push_str("</command>");
            }
        }

        doc.push_str("</epp>");
        Ok(Bytes::from(doc))
    }
}

fn push_transaction_id(doc: &mut String, id: Option<&str>) -> Result<(), EncodeError> {
    match id {
        Some(id) => push_element(doc, "clTRID", id),
        None => Ok(()),
    }
}

fn push_element(doc: &mut String, tag: &str, text: &str) -> Result<(), EncodeError> {
    let _ = write!(doc, "<{tag}>");
    push_escaped(doc, text, tag)?;
    let _ = write!(doc, "</{tag}>");
    Ok(())
}

/// Escape markup characters; reject code points XML 1.0 cannot carry at all.
fn push_escaped(doc: &mut String, text: &str, field: &str) -> Result<(), EncodeError> {
    for ch in text.chars() {
        match ch {
            '&' => doc.push_str("&amp;"),
            '<' => doc.push_str("&lt;"),
            '>' => doc.push_str("&gt;"),
            '"' => doc.push_str("&quot;"),
            '\'' => doc.push_str("&apos;"),
            '\t' | '\n' | '\r' => doc.push(ch),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                return Err(EncodeError::new(format!(
                    "<{field}> contains character U+{:04X}, not allowed in XML",
                    c as u32
                )));
            }
            c => doc.push(c),
        }
    }
    Ok(())
}
