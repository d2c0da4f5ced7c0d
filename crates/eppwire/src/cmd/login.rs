use eppwire_session::SessionConfig;

use crate::cmd::{connect, LoginArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: LoginArgs, format: OutputFormat) -> CliResult<i32> {
    let password = read_password(&args.password_env)?;
    let config = SessionConfig {
        transaction_id_prefix: args.cltrid_prefix.clone(),
        ..SessionConfig::default()
    };

    let (mut session, _greeting) = connect::open(&args.connect, config)?;
    let server = args.connect.server.as_str();

    let response = session
        .login(&args.username, &password)
        .map_err(|err| session_error("login", err))?;
    drop(password);
    print_message("login", server, &response, format);

    let response = session
        .logout()
        .map_err(|err| session_error("logout", err))?;
    print_message("logout", server, &response, format);

    Ok(SUCCESS)
}

fn read_password(var: &str) -> CliResult<String> {
    match std::env::var(var) {
        Ok(password) if !password.is_empty() => Ok(password),
        Ok(_) => Err(CliError::new(USAGE, format!("{var} is empty"))),
        Err(_) => Err(CliError::new(
            USAGE,
            format!("password not set: export {var} or pass --password-env"),
        )),
    }
}
