use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Labelled, human-readable.
    Text,
    /// One JSON object per message.
    Json,
    /// Payload bytes only.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    server: &'a str,
    /// Payload length; the frame on the wire is four bytes longer.
    payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a str>,
    binary: bool,
}

/// Print one server document (greeting or response).
pub fn print_message(kind: &str, server: &str, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let text = std::str::from_utf8(payload).ok();
            let out = MessageOutput {
                kind,
                server,
                payload_size: payload.len(),
                payload: text,
                binary: text.is_none(),
            };
            match serde_json::to_string(&out) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("error: cannot render {kind} as json: {err}"),
            }
        }
        OutputFormat::Text => {
            println!("{kind} from {server} ({} bytes):", payload.len());
            println!("{}", payload_text(payload));
        }
        OutputFormat::Raw => {
            let mut stdout = std::io::stdout().lock();
            let written = stdout
                .write_all(payload)
                .and_then(|()| stdout.write_all(b"\n"))
                .and_then(|()| stdout.flush());
            if let Err(err) = written {
                eprintln!("error: writing {kind} to stdout: {err}");
            }
        }
    }
}

fn payload_text(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
