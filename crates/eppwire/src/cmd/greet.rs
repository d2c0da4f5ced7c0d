use eppwire_session::SessionConfig;
use tracing::warn;

use crate::cmd::{connect, GreetArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: GreetArgs, format: OutputFormat) -> CliResult<i32> {
    let (mut session, greeting) = connect::open(&args.connect, SessionConfig::default())?;
    let server = args.connect.server.as_str();
    print_message("greeting", server, &greeting, format);

    if args.hello {
        let greeting = session
            .hello()
            .map_err(|err| session_error("hello", err))?;
        print_message("greeting", server, &greeting, format);
    }

    if let Err(err) = session.close() {
        warn!(error = %err, "close failed");
    }
    Ok(SUCCESS)
}
