mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "eppwire", version, about = "EPP client connection tool")]
struct Cli {
    /// Output format for server documents.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_greet_with_tls_options() {
        let cli = Cli::try_parse_from([
            "eppwire",
            "greet",
            "epp.example:700",
            "--server-name",
            "epp.example",
            "--timeout",
            "5s",
            "--hello",
        ])
        .expect("greet args should parse");

        match cli.command {
            Command::Greet(args) => {
                assert_eq!(args.connect.server, "epp.example:700");
                assert_eq!(args.connect.server_name.as_deref(), Some("epp.example"));
                assert!(args.hello);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn login_password_env_defaults() {
        let cli = Cli::try_parse_from(["eppwire", "login", "epp.example", "--username", "reg"])
            .expect("login args should parse");

        match cli.command {
            Command::Login(args) => {
                assert_eq!(args.username, "reg");
                assert_eq!(args.password_env, "EPP_PASSWORD");
                assert!(args.cltrid_prefix.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn login_requires_username() {
        let err = Cli::try_parse_from(["eppwire", "login", "epp.example"])
            .expect_err("missing username should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn client_cert_requires_key() {
        let err = Cli::try_parse_from(["eppwire", "greet", "epp.example", "--cert", "c.pem"])
            .expect_err("cert without key should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["eppwire", "version", "--format", "raw"])
            .expect("global flag should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Raw)));
    }
}
