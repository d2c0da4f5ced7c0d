use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod connect;
pub mod greet;
pub mod login;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, print the server greeting and disconnect.
    Greet(GreetArgs),
    /// Connect, log in, print the response and log out.
    Login(LoginArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Greet(args) => greet::run(args, format),
        Command::Login(args) => login::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Server address and TLS options shared by every connecting command.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Server address, `host[:port]`. Port defaults to 700.
    pub server: String,
    /// Name used for SNI and certificate verification (default: host part of SERVER).
    #[arg(long, value_name = "NAME")]
    pub server_name: Option<String>,
    /// PEM file of trusted root certificates (default: Mozilla root set).
    #[arg(long, value_name = "FILE")]
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate chain presented to the server.
    #[arg(long, value_name = "FILE", requires = "key")]
    pub cert: Option<PathBuf>,
    /// PEM private key for --cert.
    #[arg(long, value_name = "FILE", requires = "cert")]
    pub key: Option<PathBuf>,
    /// Bound on connect, handshake and each read/write (e.g. 30s, 500ms, 0 for none).
    #[arg(long, default_value = "60s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct GreetArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Also send <hello/> and print the second greeting.
    #[arg(long)]
    pub hello: bool,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Client identifier (clID).
    #[arg(long, short = 'u')]
    pub username: String,
    /// Environment variable holding the password.
    #[arg(long, value_name = "VAR", default_value = "EPP_PASSWORD")]
    pub password_env: String,
    /// Stamp login and logout with client transaction IDs `<PREFIX>-<n>`.
    #[arg(long, value_name = "PREFIX")]
    pub cltrid_prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
